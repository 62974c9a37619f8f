//! # Integration Test Flows
//!
//! The scripted ledger is ingested in bounded mode and the detector is run
//! over the resulting store.
//!
//! ## Flows Tested
//!
//! 1. **Ledger → Pipeline → Store**: every block processed, checkpoint at the end
//! 2. **Store → Detector**: finalized, unfinalized and clean nodes
//! 3. **Resume**: a partial scan is completed by a second run without rewrites

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use fv_01_event_store::{EventStore, InMemoryKVStore};
    use fv_02_block_ingestion::{IngestionConfig, IngestionPipeline, MockBlockSource};
    use fv_03_violation_detection::{DetectionConfig, ViolationDetector};
    use shared_types::{NodeId, Violation};

    use crate::fixtures::*;

    type Store = EventStore<InMemoryKVStore>;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn pipeline(
        source: &Arc<MockBlockSource>,
        store: &Arc<Store>,
    ) -> IngestionPipeline<InMemoryKVStore, MockBlockSource> {
        IngestionPipeline::new(
            IngestionConfig::for_testing(),
            Arc::clone(source),
            Arc::clone(store),
        )
    }

    fn detector(store: &Arc<Store>) -> ViolationDetector<Store> {
        ViolationDetector::new(Arc::clone(store), DetectionConfig::for_testing())
    }

    async fn ingest_script() -> Arc<Store> {
        let source = scripted_ledger();
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let report = pipeline(&source, &store)
            .run_bounded(1, SCRIPT_END)
            .await
            .unwrap();
        assert!(report.is_complete());
        store
    }

    // =============================================================================
    // LEDGER → STORE
    // =============================================================================

    #[tokio::test]
    async fn test_bounded_scan_processes_every_block() {
        let store = ingest_script().await;

        let processed = store.processed_blocks().unwrap();
        assert_eq!(processed, (1..=SCRIPT_END).collect::<BTreeSet<_>>());

        let checkpoint = store.checkpoint().unwrap().unwrap();
        assert_eq!(checkpoint.block, SCRIPT_END);
        assert_eq!(checkpoint.time, ts(SCRIPT_END));
    }

    #[tokio::test]
    async fn test_account_uptime_is_resolved_to_node() {
        let store = ingest_script().await;

        let uptimes = store.uptime_events(PROMPT_NODE, 0.0, f64::MAX).unwrap();
        assert_eq!(uptimes.len(), 1);
        assert_eq!(uptimes[0].block, 100);
        assert_eq!(store.node_by_address(PROMPT_NODE_ACCOUNT).unwrap(), Some(PROMPT_NODE));
    }

    #[tokio::test]
    async fn test_event_index_counts_skipped_events() {
        let store = ingest_script().await;

        let targets = store.target_events(LATE_NODE, ts(10), ts(10)).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].event_index, 1);
    }

    // =============================================================================
    // STORE → DETECTOR
    // =============================================================================

    #[tokio::test]
    async fn test_detector_finds_scripted_violations() {
        let store = ingest_script().await;
        let detector = detector(&store);
        let period = script_period();

        assert_eq!(
            detector.check_node(LATE_NODE, &period).unwrap(),
            vec![Violation {
                boot_requested: ts(50),
                booted_at: Some(ts(450) - 30.0),
                end_time: ts(SCRIPT_END),
            }]
        );
        assert!(detector.check_node(PROMPT_NODE, &period).unwrap().is_empty());
        assert_eq!(
            detector.check_node(SILENT_NODE, &period).unwrap(),
            vec![Violation {
                boot_requested: ts(200),
                booted_at: None,
                end_time: ts(SCRIPT_END),
            }]
        );
        // never power managed
        assert!(detector.check_node(3, &period).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_power_managed_nodes_after_scan() {
        let store = ingest_script().await;
        let detector = detector(&store);

        assert_eq!(
            detector.power_managed_nodes().unwrap(),
            BTreeSet::from([LATE_NODE, PROMPT_NODE, SILENT_NODE])
        );
        assert!(detector.node_used_power_management(LATE_NODE).unwrap());
        assert!(!detector.node_used_power_management(3).unwrap());
    }

    #[tokio::test]
    async fn test_parallel_check_matches_sequential() {
        let store = ingest_script().await;
        let detector = detector(&store);
        let period = script_period();

        let jobs: Vec<(NodeId, _)> = (1..=12).map(|n| (n, period)).collect();
        let results = detector.check_nodes_parallel(&jobs).unwrap();
        assert_eq!(results.len(), jobs.len());
        for result in results {
            assert_eq!(
                result.violations,
                detector.check_node(result.node_id, &period).unwrap()
            );
        }
    }

    // =============================================================================
    // RESUME
    // =============================================================================

    #[tokio::test]
    async fn test_partial_scan_then_resume() {
        let source = scripted_ledger();
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        let period = script_period();

        pipeline(&source, &store).run_bounded(1, 300).await.unwrap();
        assert_eq!(store.checkpoint().unwrap().unwrap().block, 300);

        // the wake-ups are still inside their boot allowance at block 300
        let early = detector(&store);
        assert!(early.check_node(LATE_NODE, &period).unwrap().is_empty());
        assert!(early.check_node(SILENT_NODE, &period).unwrap().is_empty());

        let report = pipeline(&source, &store)
            .run_bounded(1, SCRIPT_END)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.writer.blocks_committed, (SCRIPT_END - 300) as usize);
        assert_eq!(store.checkpoint().unwrap().unwrap().block, SCRIPT_END);

        let late = detector(&store);
        assert!(late.check_node(LATE_NODE, &period).unwrap()[0].finalized());
        assert!(!late.check_node(SILENT_NODE, &period).unwrap()[0].finalized());
    }

    #[tokio::test]
    async fn test_second_scan_writes_nothing() {
        let source = scripted_ledger();
        let store = Arc::new(EventStore::new(InMemoryKVStore::new()));
        pipeline(&source, &store).run_bounded(1, SCRIPT_END).await.unwrap();
        let before = detector(&store).check_node(LATE_NODE, &script_period()).unwrap();

        let report = pipeline(&source, &store)
            .run_bounded(1, SCRIPT_END)
            .await
            .unwrap();
        assert_eq!(report.writer.blocks_committed, 0);
        assert_eq!(report.writer.events_written, 0);
        assert_eq!(
            detector(&store).check_node(LATE_NODE, &script_period()).unwrap(),
            before
        );
    }
}
