//! # Key Layout
//!
//! Every table lives under its own prefix. Numeric components are
//! big-endian so lexicographic key order equals numeric order.
//!
//! | Table | Key |
//! |-------|-----|
//! | NodeUptimeReported | `upt:` node block event_index |
//! | PowerTargetChanged | `ptc:` node block event_index |
//! | PowerStateChanged  | `psc:` node block event_index |
//! | PowerState         | `pwr:` node block |
//! | ProcessedBlocks    | `blk:` block |
//! | Nodes              | `nod:` node |
//! | Account index      | `acc:` address |
//! | Metadata           | `kv:` name |

use shared_types::{BlockNumber, ChainEvent, EventIndex, NodeId};

pub const UPTIME_PREFIX: &[u8] = b"upt:";
pub const TARGET_PREFIX: &[u8] = b"ptc:";
pub const STATE_PREFIX: &[u8] = b"psc:";
pub const POWER_PREFIX: &[u8] = b"pwr:";
pub const PROCESSED_PREFIX: &[u8] = b"blk:";
pub const NODE_PREFIX: &[u8] = b"nod:";
pub const ACCOUNT_PREFIX: &[u8] = b"acc:";
pub const META_PREFIX: &[u8] = b"kv:";

pub const CHECKPOINT_BLOCK: &str = "checkpoint_block";
pub const CHECKPOINT_TIME: &str = "checkpoint_time";

const PREFIX_LEN: usize = 4;

/// `prefix || node`: scan prefix for all rows of one node.
pub fn node_prefix(prefix: &[u8], node_id: NodeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 4);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&node_id.to_be_bytes());
    key
}

/// Key of an event row.
pub fn event_key(
    prefix: &[u8],
    node_id: NodeId,
    block: BlockNumber,
    event_index: EventIndex,
) -> Vec<u8> {
    let mut key = node_prefix(prefix, node_id);
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(&event_index.to_be_bytes());
    key
}

/// Table prefix for an event variant.
pub fn prefix_for(event: &ChainEvent) -> &'static [u8] {
    match event {
        ChainEvent::Uptime(_) => UPTIME_PREFIX,
        ChainEvent::Target(_) => TARGET_PREFIX,
        ChainEvent::State(_) => STATE_PREFIX,
    }
}

/// Key of a power snapshot row.
pub fn power_key(node_id: NodeId, block: BlockNumber) -> Vec<u8> {
    let mut key = node_prefix(POWER_PREFIX, node_id);
    key.extend_from_slice(&block.to_be_bytes());
    key
}

/// Key of a processed-block marker.
pub fn processed_key(block: BlockNumber) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_LEN + 8);
    key.extend_from_slice(PROCESSED_PREFIX);
    key.extend_from_slice(&block.to_be_bytes());
    key
}

/// Inverse of `processed_key`.
pub fn block_from_processed_key(key: &[u8]) -> Option<BlockNumber> {
    let raw = key.strip_prefix(PROCESSED_PREFIX)?;
    Some(BlockNumber::from_be_bytes(raw.try_into().ok()?))
}

/// Node id embedded in any `prefix || node || ...` key.
pub fn node_from_key(key: &[u8]) -> Option<NodeId> {
    let raw = key.get(PREFIX_LEN..PREFIX_LEN + 4)?;
    Some(NodeId::from_be_bytes(raw.try_into().ok()?))
}

/// Block embedded in a power snapshot key.
pub fn block_from_power_key(key: &[u8]) -> Option<BlockNumber> {
    let raw = key.strip_prefix(POWER_PREFIX)?.get(4..12)?;
    Some(BlockNumber::from_be_bytes(raw.try_into().ok()?))
}

pub fn node_key(node_id: NodeId) -> Vec<u8> {
    node_prefix(NODE_PREFIX, node_id)
}

pub fn account_key(address: &str) -> Vec<u8> {
    let mut key = ACCOUNT_PREFIX.to_vec();
    key.extend_from_slice(address.as_bytes());
    key
}

pub fn meta_key(name: &str) -> Vec<u8> {
    let mut key = META_PREFIX.to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}
