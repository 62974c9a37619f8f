//! # Violation Detector Service
//!
//! Entry point used by the notifier and the `find-violations` tool.

use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use shared_types::{NodeId, Period, Timestamp, Violation};

use crate::algorithms;
use crate::config::DetectionConfig;
use crate::domain::{NodeCheck, ViolationError};
use crate::ports::EventSource;

/// The previous and the current period at `now`, oldest first.
pub fn recent_periods(now: Timestamp) -> [Period; 2] {
    let current = Period::containing(now);
    [current.previous(), current]
}

/// Read-only farmerbot violation detector.
pub struct ViolationDetector<E: EventSource> {
    source: Arc<E>,
    config: DetectionConfig,
}

impl<E: EventSource> ViolationDetector<E> {
    pub fn new(source: Arc<E>, config: DetectionConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<E> {
        &self.source
    }

    pub fn check_node(
        &self,
        node_id: NodeId,
        period: &Period,
    ) -> Result<Vec<Violation>, ViolationError> {
        algorithms::check_node(self.source.as_ref(), node_id, period, &self.config)
    }

    /// Violations over several periods, one per `boot_requested`.
    ///
    /// When two periods report the same request, a finalized result
    /// replaces an unfinalized one.
    pub fn get_violations(
        &self,
        node_id: NodeId,
        periods: &[Period],
    ) -> Result<Vec<Violation>, ViolationError> {
        let mut out: Vec<Violation> = Vec::new();
        for period in periods {
            for violation in self.check_node(node_id, period)? {
                match out
                    .iter_mut()
                    .find(|v| v.boot_requested == violation.boot_requested)
                {
                    Some(known) => {
                        if !known.finalized() && violation.finalized() {
                            *known = violation;
                        }
                    }
                    None => out.push(violation),
                }
            }
        }
        Ok(out)
    }

    /// Whether the node was ever put to sleep by power management.
    pub fn node_used_power_management(&self, node_id: NodeId) -> Result<bool, ViolationError> {
        self.source.has_power_down(node_id)
    }

    pub fn power_managed_nodes(&self) -> Result<BTreeSet<NodeId>, ViolationError> {
        self.source.power_managed_nodes()
    }

    /// Check many `(node, period)` jobs in parallel.
    ///
    /// Results keep the job order. A job that fails is logged and left out,
    /// so callers can compare lengths to detect failures.
    pub fn check_nodes_parallel(
        &self,
        jobs: &[(NodeId, Period)],
    ) -> Result<Vec<NodeCheck>, ViolationError> {
        if self.config.worker_threads == 0 {
            return Ok(self.run_jobs(jobs));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .thread_name(|i| format!("fv-03-check-{}", i))
            .build()
            .map_err(|e| ViolationError::ThreadPool(e.to_string()))?;
        Ok(pool.install(|| self.run_jobs(jobs)))
    }

    fn run_jobs(&self, jobs: &[(NodeId, Period)]) -> Vec<NodeCheck> {
        let results: Vec<NodeCheck> = jobs
            .par_iter()
            .filter_map(|(node_id, period)| match self.check_node(*node_id, period) {
                Ok(violations) => Some(NodeCheck {
                    node_id: *node_id,
                    period: *period,
                    violations,
                }),
                Err(e) => {
                    warn!(
                        "[fv-03] Violation check failed for node {} in period {}: {}",
                        node_id, period.offset, e
                    );
                    None
                }
            })
            .collect();

        info!(
            "[fv-03] Checked {} of {} node/period jobs",
            results.len(),
            jobs.len()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_01_event_store::{BlockWrite, EventStore, EventStoreError, InMemoryKVStore};
    use shared_types::{
        BlockNumber, BlockRef, ChainEvent, Checkpoint, NodeUptimeReported, Power,
        PowerStateChanged, PowerStateSnapshot, PowerTargetChanged,
    };

    type Store = EventStore<InMemoryKVStore>;

    fn period() -> Period {
        Period::at_offset(80)
    }

    fn t0() -> Timestamp {
        period().start + 10_000.0
    }

    /// One block per event keeps the fixtures readable.
    fn commit(store: &Store, block: BlockNumber, event: ChainEvent) {
        let block = BlockRef {
            number: block,
            hash: format!("0x{:064x}", block),
            timestamp: event.timestamp(),
        };
        store.commit_block(&BlockWrite::new(block, vec![event])).unwrap();
    }

    fn target(node_id: NodeId, target: Power, ts: Timestamp, block: BlockNumber) -> ChainEvent {
        ChainEvent::Target(PowerTargetChanged {
            farm_id: 1,
            node_id,
            target,
            block,
            event_index: 0,
            timestamp: ts,
        })
    }

    fn state(node_id: NodeId, state: Power, ts: Timestamp, block: BlockNumber) -> ChainEvent {
        ChainEvent::State(PowerStateChanged {
            farm_id: 1,
            node_id,
            state,
            down_block: if state.is_down() { Some(block) } else { None },
            block,
            event_index: 0,
            timestamp: ts,
        })
    }

    fn uptime(node_id: NodeId, ts: Timestamp, uptime: u64, block: BlockNumber) -> ChainEvent {
        ChainEvent::Uptime(NodeUptimeReported {
            node_id,
            uptime,
            timestamp_hint: ts as u64,
            block,
            event_index: 0,
            timestamp: ts,
        })
    }

    /// Node `node_id` goes to sleep before `t0` and is woken at `t0`.
    fn sleep_then_wake(store: &Store, node_id: NodeId, base_block: BlockNumber) {
        commit(store, base_block, target(node_id, Power::Down, t0() - 600.0, base_block));
        commit(store, base_block + 1, state(node_id, Power::Down, t0() - 500.0, base_block + 1));
        commit(store, base_block + 2, target(node_id, Power::Up, t0(), base_block + 2));
    }

    fn set_checkpoint(store: &Store, time: Timestamp) {
        store.set_checkpoint(Checkpoint { block: 1, time }).unwrap();
    }

    fn detector(store: Store) -> ViolationDetector<Store> {
        ViolationDetector::new(Arc::new(store), DetectionConfig::for_testing())
    }

    #[test]
    fn test_recent_periods() {
        let now = period().start + 5.0;
        assert_eq!(recent_periods(now), [Period::at_offset(79), period()]);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let detector = detector(EventStore::new(InMemoryKVStore::new()));
        let err = detector.check_node(1, &period()).unwrap_err();
        assert!(matches!(err, ViolationError::MissingCheckpoint));
    }

    #[test]
    fn test_no_violation_for_quick_wake() {
        let store = EventStore::new(InMemoryKVStore::new());
        commit(&store, 1, target(1, Power::Down, t0() - 10.0, 1));
        commit(&store, 2, state(1, Power::Down, t0(), 2));
        commit(&store, 3, target(1, Power::Up, t0() + 60.0, 3));
        commit(&store, 4, uptime(1, t0() + 1200.0, 5, 4));
        set_checkpoint(&store, t0() + 50_000.0);

        assert!(detector(store).check_node(1, &period()).unwrap().is_empty());
    }

    #[test]
    fn test_finalized_violation() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        commit(&store, 10, uptime(1, t0() + 2200.0, 10, 10));
        set_checkpoint(&store, t0() + 50_000.0);

        let violations = detector(store).check_node(1, &period()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].boot_requested, t0());
        assert_eq!(violations[0].booted_at, Some(t0() + 2190.0));
        assert_eq!(violations[0].end_time, t0() + 50_000.0);
    }

    #[test]
    fn test_unfinalized_violation_at_checkpoint() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        set_checkpoint(&store, t0() + 2000.0);

        let violations = detector(store).check_node(1, &period()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].boot_requested, t0());
        assert_eq!(violations[0].booted_at, None);
    }

    #[test]
    fn test_events_past_checkpoint_are_not_seen() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        // uptime exists but lies beyond the horizon
        commit(&store, 10, uptime(1, t0() + 2500.0, 10, 10));
        set_checkpoint(&store, t0() + 1000.0);

        assert!(detector(store).check_node(1, &period()).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_seeds_initial_state() {
        let store = EventStore::new(InMemoryKVStore::new());
        let start = period().start;
        store
            .insert_power_states(&[PowerStateSnapshot {
                node_id: 3,
                state: Power::Down,
                down_block: Some(5),
                down_time: Some(start - 86_400.0),
                target: Power::Up,
                block: 100,
                timestamp: start + 12.0,
            }])
            .unwrap();
        commit(&store, 200, uptime(3, start + 4000.0, 100, 200));
        set_checkpoint(&store, start + 50_000.0);

        let violations = detector(store).check_node(3, &period()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].boot_requested, start + 12.0);
        assert_eq!(violations[0].booted_at, Some(start + 3900.0));
    }

    #[test]
    fn test_snapshot_outside_catch_window_is_ignored() {
        let store = EventStore::new(InMemoryKVStore::new());
        let start = period().start;
        store
            .insert_power_states(&[PowerStateSnapshot {
                node_id: 3,
                state: Power::Down,
                down_block: Some(5),
                down_time: Some(start - 86_400.0),
                target: Power::Up,
                block: 100,
                timestamp: start + 31.0,
            }])
            .unwrap();
        set_checkpoint(&store, start + 50_000.0);

        // default (Up, Up) initial condition: nothing pending
        assert!(detector(store).check_node(3, &period()).unwrap().is_empty());
    }

    #[test]
    fn test_check_node_is_repeatable() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        commit(&store, 10, uptime(1, t0() + 2200.0, 10, 10));
        set_checkpoint(&store, t0() + 50_000.0);

        let detector = detector(store);
        let first = detector.check_node(1, &period()).unwrap();
        let second = detector.check_node(1, &period()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_violations_dedupes_by_request() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        commit(&store, 10, uptime(1, t0() + 2200.0, 10, 10));
        set_checkpoint(&store, t0() + 50_000.0);

        let violations = detector(store)
            .get_violations(1, &[period(), period()])
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].finalized());
    }

    #[test]
    fn test_get_violations_spans_periods() {
        let store = EventStore::new(InMemoryKVStore::new());
        let previous = period().previous();
        let early = previous.start + 10_000.0;
        commit(&store, 1, target(1, Power::Down, early - 600.0, 1));
        commit(&store, 2, state(1, Power::Down, early - 500.0, 2));
        commit(&store, 3, target(1, Power::Up, early, 3));
        commit(&store, 4, uptime(1, early + 3000.0, 10, 4));
        commit(&store, 5, state(1, Power::Up, early + 3000.0, 5));
        sleep_then_wake(&store, 1, 10);
        commit(&store, 20, uptime(1, t0() + 2200.0, 10, 20));
        set_checkpoint(&store, t0() + 50_000.0);

        let violations = detector(store)
            .get_violations(1, &[previous, period()])
            .unwrap();
        let requested: Vec<Timestamp> = violations.iter().map(|v| v.boot_requested).collect();
        assert_eq!(requested, vec![early, t0()]);
        assert!(violations.iter().all(|v| v.finalized()));
    }

    #[test]
    fn test_power_management_usage() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 4, 1);
        commit(&store, 10, state(5, Power::Up, t0(), 10));
        let detector = detector(store);

        assert!(detector.node_used_power_management(4).unwrap());
        assert!(!detector.node_used_power_management(5).unwrap());
        assert_eq!(detector.power_managed_nodes().unwrap(), BTreeSet::from([4]));
    }

    #[test]
    fn test_check_nodes_parallel_keeps_job_order() {
        let store = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&store, 1, 1);
        commit(&store, 10, uptime(1, t0() + 2200.0, 10, 10));
        sleep_then_wake(&store, 2, 20);
        set_checkpoint(&store, t0() + 50_000.0);

        let jobs: Vec<(NodeId, Period)> = (1..=6).map(|n| (n, period())).collect();
        let results = detector(store).check_nodes_parallel(&jobs).unwrap();
        assert_eq!(results.len(), 6);
        let nodes: Vec<NodeId> = results.iter().map(|r| r.node_id).collect();
        assert_eq!(nodes, vec![1, 2, 3, 4, 5, 6]);
        assert!(results[0].violations[0].finalized());
        assert!(!results[1].violations[0].finalized());
        assert!(results[2].violations.is_empty());
    }

    /// Fails every query for one node.
    struct FlakySource {
        inner: Store,
        broken: NodeId,
    }

    impl FlakySource {
        fn check(&self, node_id: NodeId) -> Result<(), ViolationError> {
            if node_id == self.broken {
                return Err(ViolationError::Store(EventStoreError::Serialization {
                    message: "injected".into(),
                }));
            }
            Ok(())
        }
    }

    impl EventSource for FlakySource {
        fn checkpoint_time(&self) -> Result<Option<Timestamp>, ViolationError> {
            self.inner.checkpoint_time()
        }

        fn uptime_events(
            &self,
            node_id: NodeId,
            from: Timestamp,
            to: Timestamp,
        ) -> Result<Vec<NodeUptimeReported>, ViolationError> {
            self.check(node_id)?;
            EventSource::uptime_events(&self.inner, node_id, from, to)
        }

        fn target_events(
            &self,
            node_id: NodeId,
            from: Timestamp,
            to: Timestamp,
        ) -> Result<Vec<PowerTargetChanged>, ViolationError> {
            EventSource::target_events(&self.inner, node_id, from, to)
        }

        fn state_events(
            &self,
            node_id: NodeId,
            from: Timestamp,
            to: Timestamp,
        ) -> Result<Vec<PowerStateChanged>, ViolationError> {
            EventSource::state_events(&self.inner, node_id, from, to)
        }

        fn power_snapshot_near(
            &self,
            node_id: NodeId,
            at: Timestamp,
            tolerance: Timestamp,
        ) -> Result<Option<PowerStateSnapshot>, ViolationError> {
            EventSource::power_snapshot_near(&self.inner, node_id, at, tolerance)
        }

        fn has_power_down(&self, node_id: NodeId) -> Result<bool, ViolationError> {
            EventSource::has_power_down(&self.inner, node_id)
        }

        fn power_managed_nodes(&self) -> Result<BTreeSet<NodeId>, ViolationError> {
            EventSource::power_managed_nodes(&self.inner)
        }
    }

    fn flaky(broken: NodeId) -> FlakySource {
        let inner = EventStore::new(InMemoryKVStore::new());
        sleep_then_wake(&inner, 1, 1);
        set_checkpoint(&inner, t0() + 50_000.0);
        FlakySource { inner, broken }
    }

    #[test]
    fn test_check_nodes_parallel_omits_failed_jobs() {
        let jobs = [(1, period()), (2, period()), (3, period())];
        for threads in [0, 3] {
            let config = DetectionConfig {
                worker_threads: threads,
                ..DetectionConfig::default()
            };
            let detector = ViolationDetector::new(Arc::new(flaky(2)), config);
            let results = detector.check_nodes_parallel(&jobs).unwrap();
            let nodes: Vec<NodeId> = results.iter().map(|r| r.node_id).collect();
            assert_eq!(nodes, vec![1, 3]);
            assert_eq!(results[0].violations.len(), 1);
        }
    }
}
