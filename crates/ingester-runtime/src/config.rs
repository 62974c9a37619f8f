//! # Runtime Configuration
//!
//! Assembled once in `main` from the command line and `FV_*` environment
//! overrides, then handed to the components by value.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FV_MIN_WORKERS` | `ingestion.min_workers` |
//! | `FV_MAX_WORKERS` | `ingestion.max_workers` |
//! | `FV_SCALE_INTERVAL_SECS` | `ingestion.scale_interval_ms` |
//! | `FV_RETRY_PASSES` | `ingestion.retry_passes` |
//! | `FV_LOG_LEVEL` | `log_level` |

use std::str::FromStr;
use std::time::Duration;

use fv_01_event_store::RocksDbConfig;
use fv_02_block_ingestion::{IngestionConfig, RangeRequest};

use crate::cli::IngesterArgs;

/// Default log filter when neither `RUST_LOG` nor `FV_LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Ledger bridge connection settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub request_timeout: Duration,
    /// How often `/head` is polled for new headers.
    pub head_poll_interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: crate::cli::DEFAULT_SOURCE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            head_poll_interval: Duration::from_secs(6),
        }
    }
}

/// Complete ingester configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub store: RocksDbConfig,
    pub source: SourceConfig,
    pub ingestion: IngestionConfig,
    pub range: RangeRequest,
    pub log_level: String,
}

impl RuntimeConfig {
    pub fn from_args(args: &IngesterArgs) -> Self {
        Self {
            store: RocksDbConfig {
                path: args.file.to_string_lossy().to_string(),
                ..Default::default()
            },
            source: SourceConfig {
                url: args.source.trim_end_matches('/').to_string(),
                ..Default::default()
            },
            ingestion: IngestionConfig::default(),
            range: RangeRequest {
                start_block: args.start_block,
                start_time: args.start,
                end_block: args.end_block,
                end_time: args.end,
            },
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Arguments plus process environment.
    pub fn load(args: &IngesterArgs) -> (Self, Vec<String>) {
        let mut config = Self::from_args(args);
        let ignored = config.apply_env(|key| std::env::var(key).ok());
        (config, ignored)
    }

    /// Apply `FV_*` overrides. Returns a message for every value that could
    /// not be parsed; those are left at their previous setting.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();
        let ingestion = &mut self.ingestion;

        override_with(&lookup, "FV_MIN_WORKERS", &mut ingestion.min_workers, &mut ignored);
        override_with(&lookup, "FV_MAX_WORKERS", &mut ingestion.max_workers, &mut ignored);
        override_with(&lookup, "FV_RETRY_PASSES", &mut ingestion.retry_passes, &mut ignored);

        let mut interval_secs = ingestion.scale_interval_ms / 1000;
        if override_with(&lookup, "FV_SCALE_INTERVAL_SECS", &mut interval_secs, &mut ignored) {
            ingestion.scale_interval_ms = interval_secs.max(1) * 1000;
        }

        if let Some(level) = lookup("FV_LOG_LEVEL") {
            self.log_level = level;
        }
        ignored
    }
}

fn override_with<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
    ignored: &mut Vec<String>,
) -> bool {
    let Some(raw) = lookup(key) else {
        return false;
    };
    match raw.trim().parse() {
        Ok(value) => {
            *target = value;
            true
        }
        Err(_) => {
            ignored.push(format!("{} has an invalid value {:?}", key, raw));
            false
        }
    }
}
