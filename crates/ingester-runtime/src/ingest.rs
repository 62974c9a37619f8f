//! # Ingestion Run
//!
//! Resolves the scan window and drives the pipeline in bounded or tail
//! mode until it completes or a shutdown is requested.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use fv_01_event_store::{EventStore, KeyValueStore};
use fv_02_block_ingestion::{
    resolve_range, BlockSource, IngestionConfig, IngestionError, IngestionPipeline, RangeRequest,
};

/// How an ingestion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Bounded range fully processed.
    Complete,
    /// Bounded range finished with blocks still unprocessed.
    Incomplete { missing: usize },
    /// Bounded run interrupted by a shutdown request.
    Interrupted,
    /// Tail mode stopped on request.
    Stopped,
}

impl RunOutcome {
    /// Process exit code: 0 when nothing is left to do, 2 when blocks
    /// remain unprocessed.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Complete | RunOutcome::Stopped => 0,
            RunOutcome::Incomplete { .. } | RunOutcome::Interrupted => 2,
        }
    }
}

/// Resolves when `shutdown` turns true. Never resolves if the sender is
/// gone without having signalled.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub async fn run_ingestion<S, B>(
    source: Arc<B>,
    store: Arc<EventStore<S>>,
    config: IngestionConfig,
    request: &RangeRequest,
    mut shutdown: watch::Receiver<bool>,
) -> Result<RunOutcome, IngestionError>
where
    S: KeyValueStore + 'static,
    B: BlockSource + 'static,
{
    let range = resolve_range(source.as_ref(), request, &config).await?;
    let pipeline = IngestionPipeline::new(config, source, store);

    let Some(end) = range.end else {
        info!("[fv-02] Following the chain from block {}", range.start);
        let report = pipeline.run_tail(range.start, shutdown).await?;
        info!(
            "[fv-02] Stopped; checkpoint at block {:?}",
            report.checkpoint.map(|cp| cp.block)
        );
        return Ok(RunOutcome::Stopped);
    };

    info!("[fv-02] Processing blocks {} to {}", range.start, end);
    tokio::select! {
        report = pipeline.run_bounded(range.start, end) => {
            let report = report?;
            if report.is_complete() {
                Ok(RunOutcome::Complete)
            } else {
                Ok(RunOutcome::Incomplete { missing: report.missing })
            }
        }
        _ = wait_for_shutdown(&mut shutdown) => {
            warn!("[fv-02] Interrupted before block {} was reached", end);
            Ok(RunOutcome::Interrupted)
        }
    }
}
