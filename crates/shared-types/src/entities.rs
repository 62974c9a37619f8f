//! # Core Domain Entities
//!
//! Entities shared by the ingestion pipeline and the violation engine.
//!
//! ## Clusters
//!
//! - **Chain**: `BlockRef`, block/node/farm identifiers
//! - **Events**: `NodeUptimeReported`, `PowerTargetChanged`, `PowerStateChanged`, `ChainEvent`
//! - **Power**: `Power`, `PowerStateSnapshot`
//! - **Identity**: `NodeIdentity`
//! - **Results**: `Violation`, `Checkpoint`

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// Height of a block on the ledger.
pub type BlockNumber = u64;

/// Opaque block hash as handed out by the ledger client (`0x`-prefixed hex).
pub type BlockHash = String;

/// Ledger node identifier.
pub type NodeId = u32;

/// Ledger twin identifier.
pub type TwinId = u32;

/// Ledger farm identifier.
pub type FarmId = u32;

/// Position of an event inside its block's event list.
pub type EventIndex = u32;

/// Seconds since the Unix epoch. Fractional values are allowed.
pub type Timestamp = f64;

/// Node id the ledger returns for twins that own no node.
pub const NO_NODE: NodeId = 0;

/// A block as seen by the ingester.
///
/// The timestamp is taken from the block's timestamp inherent (its first
/// extrinsic), never from the wall clock at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block height.
    pub number: BlockNumber,
    /// Block hash.
    pub hash: BlockHash,
    /// Block time in seconds.
    pub timestamp: Timestamp,
}

// =============================================================================
// CLUSTER B: POWER
// =============================================================================

/// Power value used both for the requested target and the confirmed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Power {
    /// Node is (or should be) running.
    #[default]
    Up,
    /// Node is (or should be) asleep.
    Down,
}

impl Power {
    /// Parse the ledger's textual representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Up" => Some(Power::Up),
            "Down" => Some(Power::Down),
            _ => None,
        }
    }

    pub fn is_down(self) -> bool {
        self == Power::Down
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Power::Up => write!(f, "Up"),
            Power::Down => write!(f, "Down"),
        }
    }
}

/// A node's power configuration captured at one block.
///
/// Written once per `(node_id, block)` by the power snapshotter and only
/// used as the initial condition of a minting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerStateSnapshot {
    pub node_id: NodeId,
    pub state: Power,
    /// Block at which the node went to sleep, when `state` is `Down`.
    pub down_block: Option<BlockNumber>,
    /// Timestamp of `down_block`.
    pub down_time: Option<Timestamp>,
    pub target: Power,
    /// Block the snapshot was taken at.
    pub block: BlockNumber,
    /// Timestamp of `block`.
    pub timestamp: Timestamp,
}

impl PowerStateSnapshot {
    /// Snapshot for a node that is not power managed.
    pub fn up(node_id: NodeId, block: BlockNumber, timestamp: Timestamp) -> Self {
        Self {
            node_id,
            state: Power::Up,
            down_block: None,
            down_time: None,
            target: Power::Up,
            block,
            timestamp,
        }
    }
}

// =============================================================================
// CLUSTER C: EVENTS
// =============================================================================

/// A node reported the number of seconds since its last boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUptimeReported {
    pub node_id: NodeId,
    /// Seconds since boot.
    pub uptime: u64,
    /// Node-supplied wall clock value, kept for diagnostics.
    pub timestamp_hint: u64,
    pub block: BlockNumber,
    pub event_index: EventIndex,
    pub timestamp: Timestamp,
}

/// A farmer (or the farmerbot) requested a power transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerTargetChanged {
    pub farm_id: FarmId,
    pub node_id: NodeId,
    pub target: Power,
    pub block: BlockNumber,
    pub event_index: EventIndex,
    pub timestamp: Timestamp,
}

/// The ledger confirmed an actual power transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerStateChanged {
    pub farm_id: FarmId,
    pub node_id: NodeId,
    pub state: Power,
    pub down_block: Option<BlockNumber>,
    pub block: BlockNumber,
    pub event_index: EventIndex,
    pub timestamp: Timestamp,
}

/// The three event kinds the ingester keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainEvent {
    Uptime(NodeUptimeReported),
    Target(PowerTargetChanged),
    State(PowerStateChanged),
}

impl ChainEvent {
    pub fn node_id(&self) -> NodeId {
        match self {
            ChainEvent::Uptime(e) => e.node_id,
            ChainEvent::Target(e) => e.node_id,
            ChainEvent::State(e) => e.node_id,
        }
    }

    pub fn block(&self) -> BlockNumber {
        match self {
            ChainEvent::Uptime(e) => e.block,
            ChainEvent::Target(e) => e.block,
            ChainEvent::State(e) => e.block,
        }
    }

    pub fn event_index(&self) -> EventIndex {
        match self {
            ChainEvent::Uptime(e) => e.event_index,
            ChainEvent::Target(e) => e.event_index,
            ChainEvent::State(e) => e.event_index,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            ChainEvent::Uptime(e) => e.timestamp,
            ChainEvent::Target(e) => e.timestamp,
            ChainEvent::State(e) => e.timestamp,
        }
    }

    /// Replay order: timestamp first, then position inside the block.
    pub fn replay_cmp(&self, other: &Self) -> Ordering {
        self.timestamp()
            .total_cmp(&other.timestamp())
            .then_with(|| self.event_index().cmp(&other.event_index()))
    }
}

// =============================================================================
// CLUSTER D: IDENTITY
// =============================================================================

/// Cached mapping from a ledger account to the node its twin owns.
///
/// Entries are immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_id: NodeId,
    pub twin_id: TwinId,
    pub address: String,
}

// =============================================================================
// CLUSTER E: RESULTS
// =============================================================================

/// Highest block up to which every block since the scan start is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: BlockNumber,
    pub time: Timestamp,
}

/// A farmerbot violation.
///
/// `booted_at` is `None` while no uptime report has proven the boot; such
/// a violation is unfinalized and must be checked again later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// When the wake-up was requested.
    pub boot_requested: Timestamp,
    /// When the node actually booted, if known.
    pub booted_at: Option<Timestamp>,
    /// Observation horizon used when the violation was computed.
    pub end_time: Timestamp,
}

impl Violation {
    pub fn finalized(&self) -> bool {
        self.booted_at.is_some()
    }

    /// Seconds between request and boot, when the boot is known.
    pub fn boot_duration(&self) -> Option<f64> {
        self.booted_at.map(|b| b - self.boot_requested)
    }
}
