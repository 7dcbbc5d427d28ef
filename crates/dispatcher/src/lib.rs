//! Hotel Gateway Dispatcher
//!
//! Turns timer ticks into bounded batches of refresh and backfill jobs:
//! keyset-paginated discovery queries over the canonical store, one job
//! per eligible entity, published to the durable work queue with a fixed
//! retry schedule on broker failure.

pub mod discovery;
pub mod orchestrator;
pub mod rpc;

pub use discovery::{EligibleRow, JobSource, MissingTranslation, PostgresJobSource};
pub use orchestrator::{JobSink, Orchestrator, QueuePublisherSink};
pub use rpc::{FetchRequest, FetchResponse, JobInfo};

use hotel_gateway_core::QueueError;

#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, DispatcherError>;
