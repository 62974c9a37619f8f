//! # Node Directory
//!
//! Resolves ledger accounts to node ids for events that name their node
//! by account. Lookups go memory cache, then store, then ledger; ledger
//! answers are persisted through the writer.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use fv_01_event_store::{EventStore, KeyValueStore};
use shared_types::{NodeId, NodeIdentity, NO_NODE};

use crate::application::writer::{WriteJob, WriterHandle};
use crate::domain::IngestionError;
use crate::ports::BlockSource;

pub struct NodeDirectory<S: KeyValueStore, B: BlockSource> {
    source: Arc<B>,
    store: Arc<EventStore<S>>,
    writer: WriterHandle,
    cache: RwLock<HashMap<String, NodeId>>,
}

impl<S: KeyValueStore, B: BlockSource> NodeDirectory<S, B> {
    pub fn new(source: Arc<B>, store: Arc<EventStore<S>>, writer: WriterHandle) -> Self {
        Self {
            source,
            store,
            writer,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Node owned by `address` as of `block_hash`, `None` if it owns none.
    pub async fn resolve(
        &self,
        address: &str,
        block_hash: &str,
    ) -> Result<Option<NodeId>, IngestionError> {
        let cached = self.cache.read().get(address).copied();
        if let Some(node_id) = cached {
            return Ok(Some(node_id));
        }

        if let Some(node_id) = self.store.node_by_address(address)? {
            self.cache.write().insert(address.to_string(), node_id);
            return Ok(Some(node_id));
        }

        let twin_id = self.source.get_twin_by_account(address, block_hash).await?;
        let node_id = self.source.get_node_by_twin(twin_id, block_hash).await?;
        if node_id == NO_NODE {
            debug!("[fv-02] Account {} owns no node", address);
            return Ok(None);
        }

        self.cache.write().insert(address.to_string(), node_id);
        self.writer.submit(WriteJob::Identity(NodeIdentity {
            node_id,
            twin_id,
            address: address.to_string(),
        }))?;
        Ok(Some(node_id))
    }

    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}
