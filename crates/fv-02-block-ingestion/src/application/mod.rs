//! # Application Module
//!
//! Tasks of the ingestion pipeline and the pipeline that drives them.

pub mod node_directory;
pub mod pipeline;
pub mod pool;
pub mod range;
pub mod snapshotter;
pub mod subscriber;
pub mod worker;
pub mod writer;

pub use node_directory::NodeDirectory;
pub use pipeline::IngestionPipeline;
pub use pool::WorkerPool;
pub use range::{resolve_range, RangeRequest};
pub use snapshotter::PowerSnapshotter;
pub use subscriber::spawn_subscriber;
pub use worker::Worker;
pub use writer::{spawn_writer, WriteJob, WriterHandle};
