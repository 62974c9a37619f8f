//! # HTTP Block Source
//!
//! `BlockSource` backed by a ledger bridge that exposes the chain as JSON.
//!
//! ## Endpoints
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `get_block_by_number` | `/blocks/{n}` | `RawBlock` |
//! | `get_block_hash` | `/blocks/{n}/hash` | `{"hash": ..}` |
//! | `get_events` | `/blocks/{hash}/events` | `[RawEvent]` |
//! | `get_node_power` | `/nodes/{id}/power?at={hash}` | `NodePower` |
//! | `get_twin_by_account` | `/twins/by-account/{address}?at={hash}` | `{"twin_id": ..}` |
//! | `get_node_by_twin` | `/nodes/by-twin/{twin}?at={hash}` | `{"node_id": ..}` |
//! | `get_current_node_count` | `/nodes/count?at={hash}` | `{"count": ..}` |
//! | `find_block_for_timestamp` | `/blocks/at/{timestamp}` | `{"number": ..}` |
//! | `latest_block_number` | `/head` | `{"number": ..}` |
//!
//! Headers are followed by polling `/head`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use fv_02_block_ingestion::{BlockSource, HeaderCallback, NodePower, RawBlock, RawEvent, SourceError};
use shared_types::{BlockHash, BlockNumber, NodeId, Timestamp, TwinId};

use crate::config::SourceConfig;

#[derive(Debug, Deserialize)]
struct HashResponse {
    hash: BlockHash,
}

#[derive(Debug, Deserialize)]
struct NumberResponse {
    number: BlockNumber,
}

#[derive(Debug, Deserialize)]
struct TwinResponse {
    twin_id: TwinId,
}

#[derive(Debug, Deserialize)]
struct NodeResponse {
    node_id: NodeId,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u32,
}

pub struct HttpBlockSource {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    connected: AtomicBool,
}

impl HttpBlockSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SourceError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            poll_interval: config.head_poll_interval,
            connected: AtomicBool::new(true),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn at(&self, path: &str, hash: &str) -> String {
        format!("{}{}?at={}", self.base_url, path, hash)
    }

    fn transport_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_connect() || err.is_timeout() {
            if self.connected.swap(false, Ordering::SeqCst) {
                warn!("[fv-02] Lost connection to ledger bridge at {}", self.base_url);
            }
            SourceError::Disconnected
        } else {
            SourceError::InvalidResponse(err.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::InvalidResponse(format!("{} returned {}", url, status)));
        }
        response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl BlockSource for HttpBlockSource {
    async fn get_block_by_number(&self, number: BlockNumber) -> Result<RawBlock, SourceError> {
        let url = self.url(&format!("/blocks/{}", number));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SourceError::BlockNotFound(number)),
            status if !status.is_success() => Err(SourceError::InvalidResponse(format!(
                "{} returned {}",
                url, status
            ))),
            _ => response
                .json()
                .await
                .map_err(|e| SourceError::InvalidResponse(format!("{}: {}", url, e))),
        }
    }

    async fn get_block_hash(&self, number: BlockNumber) -> Result<BlockHash, SourceError> {
        let body: HashResponse = self.get_json(self.url(&format!("/blocks/{}/hash", number))).await?;
        Ok(body.hash)
    }

    async fn get_events(&self, hash: &str) -> Result<Vec<RawEvent>, SourceError> {
        self.get_json(self.url(&format!("/blocks/{}/events", hash))).await
    }

    async fn get_node_power(&self, node_id: NodeId, hash: &str) -> Result<NodePower, SourceError> {
        self.get_json(self.at(&format!("/nodes/{}/power", node_id), hash)).await
    }

    async fn get_twin_by_account(&self, address: &str, hash: &str) -> Result<TwinId, SourceError> {
        let body: TwinResponse = self
            .get_json(self.at(&format!("/twins/by-account/{}", address), hash))
            .await?;
        Ok(body.twin_id)
    }

    async fn get_node_by_twin(&self, twin_id: TwinId, hash: &str) -> Result<NodeId, SourceError> {
        let body: NodeResponse = self
            .get_json(self.at(&format!("/nodes/by-twin/{}", twin_id), hash))
            .await?;
        Ok(body.node_id)
    }

    async fn get_current_node_count(&self, hash: &str) -> Result<u32, SourceError> {
        let body: CountResponse = self.get_json(self.at("/nodes/count", hash)).await?;
        Ok(body.count)
    }

    async fn find_block_for_timestamp(
        &self,
        timestamp: Timestamp,
    ) -> Result<BlockNumber, SourceError> {
        let body: NumberResponse = self
            .get_json(self.url(&format!("/blocks/at/{}", timestamp.floor() as i64)))
            .await?;
        Ok(body.number)
    }

    /// Emits the current head first, then every number above it as the
    /// head moves. Returns when a poll fails.
    async fn subscribe_new_headers(&self, callback: HeaderCallback) -> Result<(), SourceError> {
        let mut last: Option<BlockNumber> = None;
        loop {
            let head = self.latest_block_number().await?;
            let from = match last {
                Some(seen) => seen + 1,
                None => head,
            };
            for number in from..=head {
                callback(number);
            }
            if from <= head {
                debug!("[fv-02] New head {}", head);
                last = Some(head);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn latest_block_number(&self) -> Result<BlockNumber, SourceError> {
        let body: NumberResponse = self.get_json(self.url("/head")).await?;
        Ok(body.number)
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<(), SourceError> {
        match self.get_json::<NumberResponse>(self.url("/head")).await {
            Ok(_) => {
                self.connected.store(true, Ordering::SeqCst);
                info!("[fv-02] Reconnected to ledger bridge at {}", self.base_url);
                Ok(())
            }
            Err(SourceError::Disconnected) => Err(SourceError::Unreachable(self.base_url.clone())),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpBlockSource {
        HttpBlockSource::new(&SourceConfig {
            url: "http://bridge.local:8080/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let source = source();
        assert_eq!(source.base_url(), "http://bridge.local:8080");
        assert_eq!(source.url("/head"), "http://bridge.local:8080/head");
        assert_eq!(
            source.at("/nodes/7/power", "0xabc"),
            "http://bridge.local:8080/nodes/7/power?at=0xabc"
        );
    }

    #[test]
    fn test_payload_shapes() {
        let power: NodePower =
            serde_json::from_str(r#"{"state":"Down","down_block":12,"target":"Up"}"#).unwrap();
        assert_eq!(power.down_block, Some(12));

        let block: RawBlock = serde_json::from_str(
            r#"{"number":5,"hash":"0x05","extrinsics":[{"call":{"call_args":[{"value":1700000000000}]}}]}"#,
        )
        .unwrap();
        assert_eq!(fv_02_block_ingestion::block_timestamp(&block).unwrap(), 1_700_000_000.0);

        let events: Vec<RawEvent> = serde_json::from_str(
            r#"[{"event_id":"NodeUptimeReported","attributes":[1,1700000000,3600]}]"#,
        )
        .unwrap();
        assert_eq!(events[0].event_id, "NodeUptimeReported");

        let head: NumberResponse = serde_json::from_str(r#"{"number":99}"#).unwrap();
        assert_eq!(head.number, 99);
    }

    #[tokio::test]
    async fn test_unreachable_bridge() {
        // nothing listens on the discard port
        let source = HttpBlockSource::new(&SourceConfig {
            url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        assert!(source.is_connected().await);
        assert!(source.latest_block_number().await.is_err());
        assert!(!source.is_connected().await);
        assert!(source.reconnect().await.is_err());
    }
}
