//! Human readable violation reports.

use chrono::DateTime;

use shared_types::{NodeId, Timestamp, Violation};

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_time(ts: Timestamp) -> String {
    match DateTime::from_timestamp(ts.floor() as i64, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}", ts),
    }
}

pub fn format_violation(violation: &Violation) -> String {
    let mut text = format!(
        "Boot requested at:\n{} UTC\n",
        format_time(violation.boot_requested)
    );
    match violation.booted_at {
        Some(booted) => {
            text.push_str(&format!("Node booted at:\n{} UTC\n", format_time(booted)));
        }
        None => text.push_str("Node has not booted\n"),
    }
    text
}

pub fn format_violations(node_id: NodeId, violations: &[Violation]) -> String {
    if violations.is_empty() {
        return format!("No violations for node {}\n", node_id);
    }
    let mut text = format!("Violations for node {}:\n\n", node_id);
    for violation in violations {
        text.push_str(&format_violation(violation));
        text.push('\n');
    }
    text
}
