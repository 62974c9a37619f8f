//! `EventSource` over the ingester's `EventStore`.

use std::collections::BTreeSet;

use fv_01_event_store::{EventStore, KeyValueStore};
use shared_types::{
    NodeId, NodeUptimeReported, PowerStateChanged, PowerStateSnapshot, PowerTargetChanged,
    Timestamp,
};

use crate::domain::ViolationError;
use crate::ports::EventSource;

impl<S: KeyValueStore> EventSource for EventStore<S> {
    fn checkpoint_time(&self) -> Result<Option<Timestamp>, ViolationError> {
        Ok(self.checkpoint()?.map(|cp| cp.time))
    }

    fn uptime_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<NodeUptimeReported>, ViolationError> {
        Ok(EventStore::uptime_events(self, node_id, from, to)?)
    }

    fn target_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerTargetChanged>, ViolationError> {
        Ok(EventStore::target_events(self, node_id, from, to)?)
    }

    fn state_events(
        &self,
        node_id: NodeId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PowerStateChanged>, ViolationError> {
        Ok(EventStore::state_events(self, node_id, from, to)?)
    }

    fn power_snapshot_near(
        &self,
        node_id: NodeId,
        at: Timestamp,
        tolerance: Timestamp,
    ) -> Result<Option<PowerStateSnapshot>, ViolationError> {
        Ok(EventStore::power_snapshot_near(self, node_id, at, tolerance)?)
    }

    fn has_power_down(&self, node_id: NodeId) -> Result<bool, ViolationError> {
        Ok(EventStore::has_power_down(self, node_id)?)
    }

    fn power_managed_nodes(&self) -> Result<BTreeSet<NodeId>, ViolationError> {
        Ok(EventStore::power_managed_nodes(self)?)
    }
}
