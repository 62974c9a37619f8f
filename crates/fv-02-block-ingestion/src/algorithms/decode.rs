//! # Event Decoding
//!
//! Turns raw ledger events into `ChainEvent`s.
//!
//! | event_id | attributes |
//! |----------|------------|
//! | `NodeUptimeReported` | `[node, timestamp_hint, uptime]` |
//! | `PowerTargetChanged` | `{farm_id, node_id, power_target}` |
//! | `PowerStateChanged`  | `{farm_id, node_id, power_state: "Up" \| {"Down": block}}` |
//!
//! Any other event is skipped, as is a known event whose attributes do not
//! decode. The event index is the position in the block's full event list,
//! skipped events included.

use serde_json::Value;
use tracing::warn;

use shared_types::{
    BlockNumber, BlockRef, ChainEvent, DecodeError, EventIndex, NodeId, NodeUptimeReported,
    Power, PowerStateChanged, PowerTargetChanged, Timestamp,
};

use crate::ports::outbound::{RawBlock, RawEvent};

pub const NODE_UPTIME_REPORTED: &str = "NodeUptimeReported";
pub const POWER_TARGET_CHANGED: &str = "PowerTargetChanged";
pub const POWER_STATE_CHANGED: &str = "PowerStateChanged";

/// How an event names its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Id(NodeId),
    /// Ledger account that must be resolved through the node directory.
    Account(String),
}

/// An event whose node reference may still need resolving.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub node: NodeRef,
    /// Carries `node_id == NO_NODE` until resolved when `node` is an account.
    pub event: ChainEvent,
}

impl DecodedEvent {
    /// The event with its node id filled in.
    pub fn resolve(self, node_id: NodeId) -> ChainEvent {
        match self.event {
            ChainEvent::Uptime(e) => ChainEvent::Uptime(NodeUptimeReported { node_id, ..e }),
            ChainEvent::Target(e) => ChainEvent::Target(PowerTargetChanged { node_id, ..e }),
            ChainEvent::State(e) => ChainEvent::State(PowerStateChanged { node_id, ..e }),
        }
    }
}

/// Block time in whole seconds from the timestamp inherent (milliseconds).
pub fn block_timestamp(block: &RawBlock) -> Result<Timestamp, DecodeError> {
    let millis = block
        .extrinsics
        .first()
        .and_then(|ext| ext.pointer("/call/call_args/0/value"))
        .and_then(Value::as_u64)
        .ok_or(DecodeError::MissingTimestamp {
            block: block.number,
        })?;
    Ok((millis / 1000) as Timestamp)
}

fn malformed(event: &str, field: &str, block: BlockNumber) -> DecodeError {
    DecodeError::MalformedAttribute {
        event: event.to_string(),
        field: field.to_string(),
        block,
    }
}

fn as_u32(value: Option<&Value>, event: &str, field: &str, block: BlockNumber) -> Result<u32, DecodeError> {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| malformed(event, field, block))
}

fn as_u64(value: Option<&Value>, event: &str, field: &str, block: BlockNumber) -> Result<u64, DecodeError> {
    value
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed(event, field, block))
}

fn node_ref(value: Option<&Value>, event: &str, block: BlockNumber) -> Result<NodeRef, DecodeError> {
    match value {
        Some(Value::String(account)) => Ok(NodeRef::Account(account.clone())),
        other => Ok(NodeRef::Id(as_u32(other, event, "node_id", block)?)),
    }
}

fn node_id_of(node: &NodeRef) -> NodeId {
    match node {
        NodeRef::Id(id) => *id,
        NodeRef::Account(_) => shared_types::NO_NODE,
    }
}

/// `"Up"` or `{"Down": block}`.
fn power_state(value: Option<&Value>, block: BlockNumber) -> Result<(Power, Option<BlockNumber>), DecodeError> {
    match value {
        Some(Value::String(s)) => match Power::parse(s) {
            Some(Power::Up) => Ok((Power::Up, None)),
            Some(Power::Down) => Ok((Power::Down, None)),
            None => Err(DecodeError::UnknownPower(s.clone())),
        },
        Some(Value::Object(map)) => match map.get("Down") {
            Some(down) => Ok((Power::Down, down.as_u64())),
            None => Err(malformed(POWER_STATE_CHANGED, "power_state", block)),
        },
        _ => Err(malformed(POWER_STATE_CHANGED, "power_state", block)),
    }
}

fn power_target(value: Option<&Value>, block: BlockNumber) -> Result<Power, DecodeError> {
    let text = value
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(POWER_TARGET_CHANGED, "power_target", block))?;
    Power::parse(text).ok_or_else(|| DecodeError::UnknownPower(text.to_string()))
}

fn decode_uptime(attrs: &Value, block: &BlockRef, index: EventIndex) -> Result<DecodedEvent, DecodeError> {
    let n = block.number;
    let node = node_ref(attrs.get(0), NODE_UPTIME_REPORTED, n)?;
    let event = ChainEvent::Uptime(NodeUptimeReported {
        node_id: node_id_of(&node),
        timestamp_hint: as_u64(attrs.get(1), NODE_UPTIME_REPORTED, "timestamp_hint", n)?,
        uptime: as_u64(attrs.get(2), NODE_UPTIME_REPORTED, "uptime", n)?,
        block: n,
        event_index: index,
        timestamp: block.timestamp,
    });
    Ok(DecodedEvent { node, event })
}

fn decode_target(attrs: &Value, block: &BlockRef, index: EventIndex) -> Result<DecodedEvent, DecodeError> {
    let n = block.number;
    let node = node_ref(attrs.get("node_id"), POWER_TARGET_CHANGED, n)?;
    let event = ChainEvent::Target(PowerTargetChanged {
        farm_id: as_u32(attrs.get("farm_id"), POWER_TARGET_CHANGED, "farm_id", n)?,
        node_id: node_id_of(&node),
        target: power_target(attrs.get("power_target"), n)?,
        block: n,
        event_index: index,
        timestamp: block.timestamp,
    });
    Ok(DecodedEvent { node, event })
}

fn decode_state(attrs: &Value, block: &BlockRef, index: EventIndex) -> Result<DecodedEvent, DecodeError> {
    let n = block.number;
    let node = node_ref(attrs.get("node_id"), POWER_STATE_CHANGED, n)?;
    let (state, down_block) = power_state(attrs.get("power_state"), n)?;
    let event = ChainEvent::State(PowerStateChanged {
        farm_id: as_u32(attrs.get("farm_id"), POWER_STATE_CHANGED, "farm_id", n)?,
        node_id: node_id_of(&node),
        state,
        down_block,
        block: n,
        event_index: index,
        timestamp: block.timestamp,
    });
    Ok(DecodedEvent { node, event })
}

/// Decode the events of interest from a block's event list.
///
/// A malformed event is logged and dropped; the rest of the block still
/// decodes.
pub fn decode_events(block: &BlockRef, events: &[RawEvent]) -> Vec<DecodedEvent> {
    let mut out = Vec::new();
    for (i, raw) in events.iter().enumerate() {
        let index = i as EventIndex;
        let decoded = match raw.event_id.as_str() {
            NODE_UPTIME_REPORTED => decode_uptime(&raw.attributes, block, index),
            POWER_TARGET_CHANGED => decode_target(&raw.attributes, block, index),
            POWER_STATE_CHANGED => decode_state(&raw.attributes, block, index),
            _ => continue,
        };
        match decoded {
            Ok(event) => out.push(event),
            Err(e) => warn!(
                "[fv-02] Skipping {} at block {} index {}: {}",
                raw.event_id, block.number, index, e
            ),
        }
    }
    out
}
