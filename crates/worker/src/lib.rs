//! Hotel Gateway Worker
//!
//! Consumes refresh and backfill jobs from the work queue and, per job:
//! acquires the per-entity advisory lock, consults the L2 cache, calls the
//! upstream property API, upserts the canonical store, refreshes the
//! cache and schedules the next refresh deadline.

pub mod consumer;
pub mod ports;
pub mod processor;
pub mod repository;

pub use consumer::WorkerConsumer;
pub use ports::{CachePort, LockPort};
pub use processor::{JobOutcome, MessageProcessor};
pub use repository::{PostgresWorkerRepository, WorkerRepository};

use hotel_gateway_core::{CacheError, QueueError, UpstreamError};

/// Errors a job handler can surface. Anything that bubbles out of the
/// per-job pipeline routes the message to the dead-letter queue.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to decode job payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("lock service error: {0}")]
    Lock(#[source] CacheError),

    #[error("cache error: {0}")]
    Cache(#[source] CacheError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("invalid job: {0}")]
    InvalidJob(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
