//! # Outbound Ports
//!
//! The ledger client the ingester depends on.
//!
//! Production: `HttpBlockSource` (ingester-runtime)
//! Testing: `MockBlockSource`

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use shared_types::{BlockHash, BlockNumber, NodeId, Power, Timestamp, TwinId, NO_NODE};

use crate::algorithms::decode::block_timestamp;
use crate::domain::SourceError;

/// A block as returned by the ledger client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub number: BlockNumber,
    pub hash: BlockHash,
    /// Decoded extrinsics; the first one is the timestamp inherent.
    pub extrinsics: Vec<Value>,
}

/// An event as returned by the ledger client, attributes left undecoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub attributes: Value,
}

/// Power configuration of a node at some block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePower {
    pub state: Power,
    pub down_block: Option<BlockNumber>,
    pub target: Power,
}

impl Default for NodePower {
    fn default() -> Self {
        Self {
            state: Power::Up,
            down_block: None,
            target: Power::Up,
        }
    }
}

/// Invoked once per new block header.
pub type HeaderCallback = Arc<dyn Fn(BlockNumber) + Send + Sync>;

/// Ledger access used by workers, the snapshotter and the tail subscriber.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn get_block_by_number(&self, number: BlockNumber) -> Result<RawBlock, SourceError>;

    async fn get_block_hash(&self, number: BlockNumber) -> Result<BlockHash, SourceError>;

    /// Events of a block, in block order.
    async fn get_events(&self, hash: &str) -> Result<Vec<RawEvent>, SourceError>;

    /// Block time in seconds, read from the timestamp inherent.
    async fn get_timestamp(&self, block: &RawBlock) -> Result<Timestamp, SourceError> {
        Ok(block_timestamp(block)?)
    }

    async fn get_node_power(&self, node_id: NodeId, hash: &str) -> Result<NodePower, SourceError>;

    async fn get_twin_by_account(&self, address: &str, hash: &str) -> Result<TwinId, SourceError>;

    /// Node owned by a twin, `NO_NODE` when there is none.
    async fn get_node_by_twin(&self, twin_id: TwinId, hash: &str) -> Result<NodeId, SourceError>;

    /// Highest node id assigned as of the block.
    async fn get_current_node_count(&self, hash: &str) -> Result<u32, SourceError>;

    /// First block at or after `timestamp`.
    async fn find_block_for_timestamp(&self, timestamp: Timestamp)
        -> Result<BlockNumber, SourceError>;

    /// Call `callback` for every new header until the transport fails.
    async fn subscribe_new_headers(&self, callback: HeaderCallback) -> Result<(), SourceError>;

    async fn latest_block_number(&self) -> Result<BlockNumber, SourceError>;

    async fn is_connected(&self) -> bool;

    async fn reconnect(&self) -> Result<(), SourceError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

#[derive(Default)]
struct MockChain {
    blocks: BTreeMap<BlockNumber, (RawBlock, Vec<RawEvent>)>,
    powers: HashMap<NodeId, NodePower>,
    twins: HashMap<String, TwinId>,
    nodes_by_twin: HashMap<TwinId, NodeId>,
    node_count: u32,
    block_failures: HashMap<BlockNumber, usize>,
    block_delays: HashMap<BlockNumber, Duration>,
    power_failures: HashMap<NodeId, usize>,
    connected: bool,
    unreachable: bool,
    reconnects: usize,
    power_queries: usize,
}

/// In-memory ledger.
///
/// Blocks carry a timestamp inherent built from `timestamp_of`. The head is
/// the highest pushed block; pushing a block wakes subscribers.
pub struct MockBlockSource {
    chain: Mutex<MockChain>,
    head_changed: Notify,
}

impl Default for MockBlockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBlockSource {
    pub fn new() -> Self {
        Self {
            chain: Mutex::new(MockChain {
                connected: true,
                ..Default::default()
            }),
            head_changed: Notify::new(),
        }
    }

    /// Block time used for block `number`: 6 second blocks from 1_700_000_000.
    pub fn timestamp_of(number: BlockNumber) -> Timestamp {
        (1_700_000_000 + number * 6) as Timestamp
    }

    pub fn hash_of(number: BlockNumber) -> BlockHash {
        format!("0x{:064x}", number)
    }

    /// Timestamp inherent as the ledger client decodes it.
    pub fn timestamp_extrinsic(millis: u64) -> Value {
        serde_json::json!({
            "call": {
                "call_module": "Timestamp",
                "call_function": "set",
                "call_args": [{ "name": "now", "value": millis }]
            }
        })
    }

    /// Add a block with the given events.
    pub fn push_block(&self, number: BlockNumber, events: Vec<RawEvent>) {
        let millis = (Self::timestamp_of(number) as u64) * 1000;
        let block = RawBlock {
            number,
            hash: Self::hash_of(number),
            extrinsics: vec![Self::timestamp_extrinsic(millis)],
        };
        self.chain.lock().blocks.insert(number, (block, events));
        self.head_changed.notify_waiters();
    }

    /// Add empty blocks `from..=to`.
    pub fn push_empty_blocks(&self, from: BlockNumber, to: BlockNumber) {
        for number in from..=to {
            self.push_block(number, Vec::new());
        }
    }

    pub fn set_node_power(&self, node_id: NodeId, power: NodePower) {
        self.chain.lock().powers.insert(node_id, power);
    }

    pub fn set_node_count(&self, count: u32) {
        self.chain.lock().node_count = count;
    }

    pub fn register_account(&self, address: &str, twin_id: TwinId, node_id: NodeId) {
        let mut chain = self.chain.lock();
        chain.twins.insert(address.to_string(), twin_id);
        chain.nodes_by_twin.insert(twin_id, node_id);
    }

    /// Make the next `times` fetches of block `number` fail.
    pub fn fail_block(&self, number: BlockNumber, times: usize) {
        self.chain.lock().block_failures.insert(number, times);
    }

    /// Hold every successful fetch of block `number` for `delay`.
    pub fn delay_block(&self, number: BlockNumber, delay: Duration) {
        self.chain.lock().block_delays.insert(number, delay);
    }

    /// Make the next `times` power queries for `node_id` fail.
    pub fn fail_power(&self, node_id: NodeId, times: usize) {
        self.chain.lock().power_failures.insert(node_id, times);
    }

    /// Drop the connection; subscriptions end with `Disconnected`.
    pub fn disconnect(&self) {
        self.chain.lock().connected = false;
        self.head_changed.notify_waiters();
    }

    /// Fail every call as if the ledger were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.chain.lock().unreachable = unreachable;
    }

    pub fn reconnect_count(&self) -> usize {
        self.chain.lock().reconnects
    }

    pub fn power_query_count(&self) -> usize {
        self.chain.lock().power_queries
    }

    fn check_reachable(chain: &MockChain) -> Result<(), SourceError> {
        if chain.unreachable {
            return Err(SourceError::Unreachable("mock ledger down".to_string()));
        }
        Ok(())
    }

    fn number_of(hash: &str) -> Result<BlockNumber, SourceError> {
        BlockNumber::from_str_radix(hash.trim_start_matches("0x"), 16)
            .map_err(|_| SourceError::InvalidResponse(format!("unknown hash {hash}")))
    }

    fn head(chain: &MockChain) -> Option<BlockNumber> {
        chain.blocks.keys().next_back().copied()
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn get_block_by_number(&self, number: BlockNumber) -> Result<RawBlock, SourceError> {
        let (block, delay) = {
            let mut chain = self.chain.lock();
            Self::check_reachable(&chain)?;
            if let Some(left) = chain.block_failures.get_mut(&number) {
                if *left > 0 {
                    *left -= 1;
                    return Err(SourceError::Unreachable(format!(
                        "injected failure for block {number}"
                    )));
                }
            }
            let block = chain
                .blocks
                .get(&number)
                .map(|(block, _)| block.clone())
                .ok_or(SourceError::BlockNotFound(number))?;
            (block, chain.block_delays.get(&number).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(block)
    }

    async fn get_block_hash(&self, number: BlockNumber) -> Result<BlockHash, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain
            .blocks
            .get(&number)
            .map(|(block, _)| block.hash.clone())
            .ok_or(SourceError::BlockNotFound(number))
    }

    async fn get_events(&self, hash: &str) -> Result<Vec<RawEvent>, SourceError> {
        let number = Self::number_of(hash)?;
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain
            .blocks
            .get(&number)
            .map(|(_, events)| events.clone())
            .ok_or(SourceError::BlockNotFound(number))
    }

    async fn get_node_power(&self, node_id: NodeId, _hash: &str) -> Result<NodePower, SourceError> {
        let mut chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain.power_queries += 1;
        if let Some(left) = chain.power_failures.get_mut(&node_id) {
            if *left > 0 {
                *left -= 1;
                return Err(SourceError::Unreachable(format!(
                    "injected failure for node {node_id}"
                )));
            }
        }
        Ok(chain.powers.get(&node_id).copied().unwrap_or_default())
    }

    async fn get_twin_by_account(&self, address: &str, _hash: &str) -> Result<TwinId, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain
            .twins
            .get(address)
            .copied()
            .ok_or_else(|| SourceError::InvalidResponse(format!("no twin for {address}")))
    }

    async fn get_node_by_twin(&self, twin_id: TwinId, _hash: &str) -> Result<NodeId, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        Ok(chain.nodes_by_twin.get(&twin_id).copied().unwrap_or(NO_NODE))
    }

    async fn get_current_node_count(&self, _hash: &str) -> Result<u32, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        Ok(chain.node_count)
    }

    async fn find_block_for_timestamp(
        &self,
        timestamp: Timestamp,
    ) -> Result<BlockNumber, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain
            .blocks
            .keys()
            .copied()
            .find(|n| Self::timestamp_of(*n) >= timestamp)
            .ok_or_else(|| SourceError::InvalidResponse(format!("no block at {timestamp}")))
    }

    async fn subscribe_new_headers(&self, callback: HeaderCallback) -> Result<(), SourceError> {
        let mut last: Option<BlockNumber> = None;
        loop {
            let notified = self.head_changed.notified();
            let fresh: Vec<BlockNumber> = {
                let chain = self.chain.lock();
                if !chain.connected || chain.unreachable {
                    return Err(SourceError::Disconnected);
                }
                match (last, Self::head(&chain)) {
                    (None, Some(head)) => vec![head],
                    (Some(prev), Some(head)) if head > prev => (prev + 1..=head).collect(),
                    _ => Vec::new(),
                }
            };
            for number in fresh {
                callback(number);
                last = Some(number);
            }
            notified.await;
        }
    }

    async fn latest_block_number(&self) -> Result<BlockNumber, SourceError> {
        let chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        Self::head(&chain).ok_or(SourceError::BlockNotFound(0))
    }

    async fn is_connected(&self) -> bool {
        let chain = self.chain.lock();
        chain.connected && !chain.unreachable
    }

    async fn reconnect(&self) -> Result<(), SourceError> {
        let mut chain = self.chain.lock();
        Self::check_reachable(&chain)?;
        chain.connected = true;
        chain.reconnects += 1;
        Ok(())
    }
}
