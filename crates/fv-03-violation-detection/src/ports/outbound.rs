//! # Outbound Ports
//!
//! Read-only view of the ingested ledger data the detector replays.
//! Implemented for `EventStore` in `adapters/event_store.rs`.

use std::collections::BTreeSet;

use shared_types::{
    NodeId, NodeUptimeReported, PowerStateChanged, PowerStateSnapshot, PowerTargetChanged,
    Timestamp,
};

use crate::domain::ViolationError;

/// Event queries used by the replay engine.
///
/// Time ranges are inclusive on both ends.
pub trait EventSource: Send + Sync {
    /// Block time of the ingestion checkpoint, if any.
    fn checkpoint_time(&self) -> Result<Option<Timestamp>, ViolationError>;

    fn uptime_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<NodeUptimeReported>, ViolationError>;

    fn target_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerTargetChanged>, ViolationError>;

    fn state_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerStateChanged>, ViolationError>;

    /// Snapshot of the node taken within `tolerance` seconds of `at`.
    fn power_snapshot_near(
        &self,
        node_id: NodeId,
        at: Timestamp,
        tolerance: Timestamp,
    ) -> Result<Option<PowerStateSnapshot>, ViolationError>;

    /// Whether the node was ever confirmed asleep.
    fn has_power_down(&self, node_id: NodeId) -> Result<bool, ViolationError>;

    /// Every node that was ever confirmed asleep.
    fn power_managed_nodes(&self) -> Result<BTreeSet<NodeId>, ViolationError>;
}
