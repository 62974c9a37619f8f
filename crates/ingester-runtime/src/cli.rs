//! Command line arguments of both executables.

use clap::Parser;
use std::path::PathBuf;

use shared_types::{BlockNumber, NodeId, Timestamp};

pub const DEFAULT_DB_FILE: &str = "tfchain_data.db";
pub const DEFAULT_SOURCE_URL: &str = "http://127.0.0.1:8080";

/// Scan the ledger into the event store.
#[derive(Parser, Debug, Clone)]
#[command(name = "ingester")]
#[command(about = "Ingest farmerbot related ledger events into a local event store")]
pub struct IngesterArgs {
    /// Event store location.
    #[arg(short, long, default_value = DEFAULT_DB_FILE)]
    pub file: PathBuf,

    /// Start scanning at the block closest to this timestamp. Defaults to
    /// the start of the current minting period.
    #[arg(short, long)]
    pub start: Option<Timestamp>,

    /// Start scanning at this block. Takes precedence over --start.
    #[arg(long)]
    pub start_block: Option<BlockNumber>,

    /// Stop after the block at this timestamp (plus a margin) and exit.
    /// Without an end, new blocks are followed until interrupted.
    #[arg(short, long)]
    pub end: Option<Timestamp>,

    /// Stop after this block and exit. Takes precedence over --end.
    #[arg(long)]
    pub end_block: Option<BlockNumber>,

    /// Ledger bridge URL.
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub source: String,
}

/// Print the farmerbot violations of a node for one minting period.
#[derive(Parser, Debug, Clone)]
#[command(name = "find-violations")]
#[command(about = "Replay a node's power events and list its boot violations")]
pub struct FindViolationsArgs {
    /// Event store written by the ingester.
    pub file: PathBuf,

    pub node: NodeId,

    /// Any timestamp inside the period to check.
    pub time: Timestamp,

    /// Log every replayed event.
    #[arg(short, long)]
    pub verbose: bool,
}
