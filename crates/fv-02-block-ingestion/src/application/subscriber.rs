//! # Live Tail Subscriber
//!
//! Feeds new block numbers into the queue and publishes the highest head
//! seen. The task ends when the source's subscription fails; the control
//! loop notices and respawns it.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shared_types::BlockNumber;

use crate::domain::BlockQueue;
use crate::ports::{BlockSource, HeaderCallback};

pub type HeadSender = Arc<watch::Sender<Option<BlockNumber>>>;

pub fn spawn_subscriber<B: BlockSource + 'static>(
    source: Arc<B>,
    queue: Arc<BlockQueue>,
    head: HeadSender,
) -> JoinHandle<()> {
    let callback: HeaderCallback = Arc::new(move |number| {
        queue.push(number);
        head.send_if_modified(|current| match current {
            Some(known) if *known >= number => false,
            _ => {
                *current = Some(number);
                true
            }
        });
    });

    tokio::spawn(async move {
        debug!("[fv-02] Header subscription started");
        match source.subscribe_new_headers(callback).await {
            Ok(()) => debug!("[fv-02] Header subscription ended"),
            Err(e) => warn!("[fv-02] Header subscription failed: {}", e),
        }
    })
}
