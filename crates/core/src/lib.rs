//! # Hotel Gateway Core
//!
//! Shared building blocks for the hotel-gateway services: the canonical
//! entities, pipeline message kinds, configuration loading, the PostgreSQL
//! pool, the Redis-backed cache/lock/work-queue adapters, the upstream
//! property API client, and the retry/circuit-breaker utilities the
//! ingestion pipeline is built on.
//!
//! ## Modules
//!
//! - `models`: Hotel, review and translation records plus upstream DTOs
//! - `message`: Message kinds and the queue job envelope
//! - `config`: YAML + environment configuration for every service
//! - `database`: Shared PostgreSQL connection pool and migrations
//! - `cache`: Redis cache and advisory lock adapters
//! - `queue`: Durable work queue on Redis Streams (publish / consume / DLQ)
//! - `upstream`: Rate-limited, circuit-broken property API client
//! - `resilience`: Circuit breaker state machine
//! - `retry`: Exponential backoff retry policy
//! - `observability`: Structured JSON logging initialization
//! - `shutdown`: SIGINT/SIGTERM handling

pub mod cache;
pub mod config;
pub mod database;
pub mod message;
pub mod models;
pub mod observability;
pub mod queue;
pub mod resilience;
pub mod retry;
pub mod shutdown;
pub mod upstream;

pub use cache::{CacheError, RedisCache, RedisLock};
pub use config::{
    ApiConfig, DispatcherConfig, EntityTtl, GatewayConfig, SchedulerConfig, TtlConfig,
    UpstreamConfig, WorkerConfig,
};
pub use database::{connect_pool, run_migrations, DatabaseSettings};
pub use message::{JobData, JobMessage, MessageKind, RpcMessageType, DESIRED_LANGS};
pub use models::{HotelRecord, ReviewRecord, TranslationRecord};
pub use queue::{JobConsumer, JobPublisher, QueueError, QueueStats};
pub use resilience::{BreakerConfig, CircuitBreaker, CircuitOpen, CircuitState};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use upstream::{PropertyApiClient, UpstreamError};

/// Errors shared across the gateway services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {message}")]
    Configuration { message: String, key: Option<String> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
