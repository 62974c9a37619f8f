//! # Find Violations
//!
//! Prints the farmerbot violations of one node for the minting period
//! containing the given timestamp.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use fv_01_event_store::{EventStore, RocksDbStore};
use fv_03_violation_detection::{DetectionConfig, ViolationDetector};
use ingester_runtime::{format_violations, init_tracing, FindViolationsArgs};
use shared_types::Period;

fn main() -> ExitCode {
    let args = FindViolationsArgs::parse();
    let filter = if args.verbose { "info,fv_03_violation_detection=debug" } else { "warn" };
    if let Err(e) = init_tracing(filter) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }

    match run(&args) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: &FindViolationsArgs) -> Result<String> {
    let path = args.file.to_string_lossy().to_string();
    // read-only so a running ingester keeps its lock on the store
    let kv = RocksDbStore::open_read_only(&path)
        .with_context(|| format!("Failed to open event store at {}", path))?;

    let detector = ViolationDetector::new(Arc::new(EventStore::new(kv)), DetectionConfig::default());
    let period = Period::containing(args.time);
    let violations = detector
        .check_node(args.node, &period)
        .with_context(|| format!("Violation check for node {} failed", args.node))?;
    Ok(format_violations(args.node, &violations))
}
