//! # Ingester
//!
//! Scans the ledger into the local event store. With an end block or
//! timestamp the range is processed once and the process exits; without
//! one, new blocks are followed until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use fv_01_event_store::{EventStore, RocksDbStore};
use fv_02_block_ingestion::BlockSource;
use ingester_runtime::{
    init_tracing, run_ingestion, HttpBlockSource, IngesterArgs, RunOutcome, RuntimeConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = IngesterArgs::parse();
    let (config, ignored) = RuntimeConfig::load(&args);

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }
    for message in ignored {
        warn!("Ignoring environment override: {}", message);
    }

    match run(config).await {
        Ok(outcome) => {
            info!("Ingester finished: {:?}", outcome);
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!("Ingester failed: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: RuntimeConfig) -> Result<RunOutcome> {
    info!("===========================================");
    info!("  Farmerbot Violation Ingester v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let kv = RocksDbStore::open(config.store.clone())
        .with_context(|| format!("Failed to open event store at {}", config.store.path))?;
    let store = Arc::new(EventStore::new(kv));

    let source = Arc::new(
        HttpBlockSource::new(&config.source).context("Failed to build ledger bridge client")?,
    );
    let head = source
        .latest_block_number()
        .await
        .with_context(|| format!("Ledger bridge at {} is unreachable", config.source.url))?;
    info!("Connected to {} (head at block {})", config.source.url, head);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let outcome = run_ingestion(source, store, config.ingestion, &config.range, shutdown_rx)
        .await
        .context("Ingestion failed")?;
    Ok(outcome)
}
