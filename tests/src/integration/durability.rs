//! # Durability and Ordering
//!
//! Results survive a RocksDB reopen, and a read-only checker can open the
//! store while the ingester still holds it. The detector's answer does not
//! depend on the order blocks were committed in.

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use std::sync::Arc;

    use fv_01_event_store::{BlockWrite, EventStore, InMemoryKVStore, RocksDbConfig, RocksDbStore};
    use fv_02_block_ingestion::{decode_events, BlockSource, IngestionConfig, IngestionPipeline};
    use fv_03_violation_detection::{DetectionConfig, ViolationDetector};
    use shared_types::{BlockNumber, BlockRef};

    use crate::fixtures::*;

    fn open(path: &std::path::Path) -> EventStore<RocksDbStore> {
        let config = RocksDbConfig::for_testing(path.to_string_lossy().to_string());
        EventStore::new(RocksDbStore::open(config).unwrap())
    }

    #[tokio::test]
    async fn test_rocksdb_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.db");

        let expected = {
            let store = Arc::new(open(&path));
            let pipeline = IngestionPipeline::new(
                IngestionConfig::for_testing(),
                scripted_ledger(),
                Arc::clone(&store),
            );
            let report = pipeline.run_bounded(1, SCRIPT_END).await.unwrap();
            assert!(report.is_complete());
            drop(pipeline);

            let detector = ViolationDetector::new(store, DetectionConfig::for_testing());
            detector.check_node(LATE_NODE, &script_period()).unwrap()
        };
        assert_eq!(expected.len(), 1);

        let reopened = Arc::new(open(&path));
        assert_eq!(reopened.checkpoint().unwrap().unwrap().block, SCRIPT_END);
        assert!(reopened.is_processed(SCRIPT_END).unwrap());

        let detector = ViolationDetector::new(reopened, DetectionConfig::for_testing());
        assert_eq!(
            detector.check_node(LATE_NODE, &script_period()).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_read_only_checker_runs_beside_live_ingester() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.db");

        let live = Arc::new(open(&path));
        let pipeline = IngestionPipeline::new(
            IngestionConfig::for_testing(),
            scripted_ledger(),
            Arc::clone(&live),
        );
        assert!(pipeline.run_bounded(1, SCRIPT_END).await.unwrap().is_complete());
        let expected = ViolationDetector::new(Arc::clone(&live), DetectionConfig::for_testing())
            .check_node(LATE_NODE, &script_period())
            .unwrap();

        // `live` still holds the database lock here
        let reader = EventStore::new(RocksDbStore::open_read_only(&path).unwrap());
        assert_eq!(reader.checkpoint().unwrap().unwrap().block, SCRIPT_END);

        let detector = ViolationDetector::new(Arc::new(reader), DetectionConfig::for_testing());
        assert_eq!(detector.check_node(LATE_NODE, &script_period()).unwrap(), expected);
        assert!(live.is_processed(SCRIPT_END).unwrap());
    }

    /// Decode the scripted blocks the way a worker would, without the pool.
    async fn decoded_blocks() -> Vec<BlockWrite> {
        let source = scripted_ledger();
        let mut writes = Vec::new();
        for number in 1..=SCRIPT_END {
            let raw = source.get_block_by_number(number).await.unwrap();
            let block = BlockRef {
                number,
                hash: raw.hash.clone(),
                timestamp: source.get_timestamp(&raw).await.unwrap(),
            };
            let events = source.get_events(&raw.hash).await.unwrap();
            let resolved = decode_events(&block, &events)
                .into_iter()
                .map(|decoded| {
                    // the only account in the script belongs to the prompt node
                    let node_id = match decoded.node {
                        fv_02_block_ingestion::NodeRef::Id(id) => id,
                        fv_02_block_ingestion::NodeRef::Account(_) => PROMPT_NODE,
                    };
                    decoded.resolve(node_id)
                })
                .collect();
            writes.push(BlockWrite::new(block, resolved));
        }
        writes
    }

    fn detect_all(store: EventStore<InMemoryKVStore>) -> Vec<Vec<shared_types::Violation>> {
        store.advance_checkpoint(1).unwrap();
        let detector = ViolationDetector::new(Arc::new(store), DetectionConfig::for_testing());
        [LATE_NODE, PROMPT_NODE, SILENT_NODE]
            .iter()
            .map(|node| detector.check_node(*node, &script_period()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_commit_order_does_not_change_results() {
        let mut writes = decoded_blocks().await;

        let ordered = EventStore::new(InMemoryKVStore::new());
        for write in &writes {
            ordered.commit_block(write).unwrap();
        }
        let expected = detect_all(ordered);
        assert!(expected[0][0].finalized());
        assert!(expected[1].is_empty());
        assert!(!expected[2][0].finalized());

        let mut rng = rand::thread_rng();
        for _ in 0..3 {
            writes.shuffle(&mut rng);
            let shuffled = EventStore::new(InMemoryKVStore::new());
            for write in &writes {
                shuffled.commit_block(write).unwrap();
            }
            assert_eq!(detect_all(shuffled), expected);
        }
    }

    #[test]
    fn test_script_spans_one_period() {
        let period = script_period();
        let last: BlockNumber = SCRIPT_END;
        assert!(period.contains(ts(1)));
        assert!(period.contains(ts(last)));
    }
}
