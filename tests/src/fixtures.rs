//! # Scripted Ledger
//!
//! Blocks `1..=SCRIPT_END` of a `MockBlockSource` carrying three power
//! managed nodes with known outcomes:
//!
//! | Node | Story | Outcome at `SCRIPT_END` |
//! |------|-------|-------------------------|
//! | 7 | woken at block 50, boots 40 min later | finalized violation |
//! | 8 | woken at block 60, boots 4 min later, reports by account | none |
//! | 9 | woken at block 200, never reports | unfinalized violation |

use serde_json::{json, Value};
use std::sync::Arc;

use fv_02_block_ingestion::{MockBlockSource, RawEvent};
use shared_types::{BlockNumber, NodeId, Period, Timestamp};

/// One hour of six second blocks.
pub const SCRIPT_END: BlockNumber = 600;

pub const LATE_NODE: NodeId = 7;
pub const PROMPT_NODE: NodeId = 8;
pub const SILENT_NODE: NodeId = 9;

pub const PROMPT_NODE_ACCOUNT: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

pub fn ts(block: BlockNumber) -> Timestamp {
    MockBlockSource::timestamp_of(block)
}

/// The period the scripted blocks fall into.
pub fn script_period() -> Period {
    Period::containing(ts(1))
}

pub fn raw(event_id: &str, attributes: Value) -> RawEvent {
    RawEvent {
        event_id: event_id.to_string(),
        attributes,
    }
}

pub fn target(node: NodeId, power: &str) -> RawEvent {
    raw(
        "PowerTargetChanged",
        json!({ "farm_id": 1, "node_id": node, "power_target": power }),
    )
}

pub fn sleep(node: NodeId, block: BlockNumber) -> RawEvent {
    raw(
        "PowerStateChanged",
        json!({ "farm_id": 1, "node_id": node, "power_state": { "Down": block } }),
    )
}

pub fn uptime(node: Value, block: BlockNumber, uptime: u64) -> RawEvent {
    raw("NodeUptimeReported", json!([node, ts(block) as u64, uptime]))
}

/// Every event the script places, by block.
pub fn script_events(block: BlockNumber) -> Vec<RawEvent> {
    match block {
        10 => vec![
            raw("Balances.Transfer", json!({ "amount": 5 })),
            target(LATE_NODE, "Down"),
        ],
        11 => vec![sleep(LATE_NODE, 11)],
        20 => vec![target(PROMPT_NODE, "Down")],
        21 => vec![sleep(PROMPT_NODE, 21)],
        30 => vec![target(SILENT_NODE, "Down")],
        31 => vec![sleep(SILENT_NODE, 31)],
        50 => vec![target(LATE_NODE, "Up")],
        60 => vec![target(PROMPT_NODE, "Up")],
        100 => vec![uptime(json!(PROMPT_NODE_ACCOUNT), 100, 10)],
        200 => vec![target(SILENT_NODE, "Up")],
        450 => vec![uptime(json!(LATE_NODE), 450, 30)],
        _ => Vec::new(),
    }
}

/// Mock ledger loaded with the script.
pub fn scripted_ledger() -> Arc<MockBlockSource> {
    let source = Arc::new(MockBlockSource::new());
    for block in 1..=SCRIPT_END {
        source.push_block(block, script_events(block));
    }
    source.register_account(PROMPT_NODE_ACCOUNT, 80, PROMPT_NODE);
    source.set_node_count(12);
    source
}
