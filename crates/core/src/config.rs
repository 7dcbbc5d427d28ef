//! Configuration for all gateway services.
//!
//! Settings come from a YAML file (`config/gateway.yaml` by default, path
//! overridable via `HOTEL_GATEWAY_CONFIG`) overlaid with environment
//! variables carrying the `HOTEL_GATEWAY` prefix and `__` as the nesting
//! separator (e.g. `HOTEL_GATEWAY__WORKER__PREFETCH_COUNT=64`). Every
//! field has a default so a service can boot against local backends with
//! no file at all.

use crate::database::DatabaseSettings;
use crate::CoreError;
use serde::{Deserialize, Serialize};

/// Top-level configuration, one section per service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub scheduler: SchedulerConfig,
    pub dispatcher: DispatcherConfig,
    pub worker: WorkerConfig,
    pub api: ApiConfig,
}

impl GatewayConfig {
    /// Load the configuration file and environment overrides.
    pub fn load() -> Result<Self, CoreError> {
        let path = std::env::var("HOTEL_GATEWAY_CONFIG")
            .unwrap_or_else(|_| "config/gateway".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("HOTEL_GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CoreError::Configuration {
                message: format!("failed to read configuration: {}", e),
                key: None,
            })?;

        settings
            .try_deserialize()
            .map_err(|e| CoreError::Configuration {
                message: format!("failed to deserialize configuration: {}", e),
                key: None,
            })
    }
}

/// Timer service settings: tick intervals per message kind and where the
/// dispatcher RPC listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub intervals_in_minutes: IntervalsConfig,
    pub dispatcher_host: String,
    pub dispatcher_port: u16,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            intervals_in_minutes: IntervalsConfig::default(),
            dispatcher_host: "127.0.0.1".to_string(),
            dispatcher_port: 50052,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalsConfig {
    pub update_hotels: u64,
    pub update_reviews: u64,
    pub update_translations: u64,
    pub fetch_missing_translations: u64,
    pub fetch_missing_reviews: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            update_hotels: 5,
            update_reviews: 10,
            update_translations: 10,
            fetch_missing_translations: 15,
            fetch_missing_reviews: 15,
        }
    }
}

/// Dispatcher settings: RPC bind address, discovery batching and the
/// publish retry bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub redis_url: String,
    pub main_queue: String,
    pub max_retry_attempts: usize,
    pub batch_size: i64,
    pub batch_delay_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50052,
            database: DatabaseSettings::default(),
            redis_url: "redis://localhost:6379".to_string(),
            main_queue: "hotel_jobs".to_string(),
            max_retry_attempts: 5,
            batch_size: 1000,
            batch_delay_ms: 50,
        }
    }
}

/// Per-entity TTL triple driving lock lifetime, cache freshness and the
/// refresh deadline written after a successful run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityTtl {
    pub lock_seconds: u64,
    pub cache_seconds: u64,
    pub next_update_seconds: i64,
}

impl Default for EntityTtl {
    fn default() -> Self {
        Self {
            lock_seconds: 300,
            cache_seconds: 3600,
            next_update_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub hotels: EntityTtl,
    pub reviews: EntityTtl,
    pub translations: EntityTtl,
}

impl TtlConfig {
    /// TTL triple for a message kind, by entity family.
    pub fn for_kind(&self, kind: crate::message::MessageKind) -> EntityTtl {
        use crate::message::MessageKind;
        match kind {
            MessageKind::UpdateHotel => self.hotels,
            MessageKind::UpdateReview | MessageKind::FetchReview => self.reviews,
            MessageKind::UpdateTranslation | MessageKind::FetchTranslation => self.translations,
        }
    }
}

/// Upstream property API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub rate_limit_per_second: u32,
    pub burst_limit: u32,
    pub max_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub breaker_max_failures: u32,
    pub breaker_reset_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://content-api.example.com/v3.0".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
            rate_limit_per_second: 10,
            burst_limit: 20,
            max_retry_attempts: 3,
            retry_base_delay_ms: 1000,
            breaker_max_failures: 5,
            breaker_reset_seconds: 60,
        }
    }
}

/// Worker settings: backends, queue consumption bounds and TTL triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub database: DatabaseSettings,
    pub redis_url: String,
    pub main_queue: String,
    pub prefetch_count: usize,
    pub max_retry_attempts: usize,
    pub consumer_block_ms: u64,
    pub ttl: TtlConfig,
    pub upstream: UpstreamConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            redis_url: "redis://localhost:6379".to_string(),
            main_queue: "hotel_jobs".to_string(),
            prefetch_count: 32,
            max_retry_attempts: 5,
            consumer_block_ms: 2000,
            ttl: TtlConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// External search index settings (Typesense-compatible collection API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchIndexSettings {
    pub host: String,
    pub api_key: String,
    pub collection: String,
    pub timeout_seconds: u64,
}

impl Default for SearchIndexSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8108".to_string(),
            api_key: String::new(),
            collection: "hotels".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Index synchronization defaults for the admin sync endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub batch_pause_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_pause_ms: 100,
        }
    }
}

/// Per-client-IP rate limiting for the read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            burst: 40,
        }
    }
}

/// Read API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub shutdown_timeout_seconds: u64,
    pub database: DatabaseSettings,
    pub redis_url: String,
    pub hotel_cache_seconds: u64,
    pub search: SearchIndexSettings,
    pub sync: SyncSettings,
    pub rate_limit: RateLimitSettings,
    pub upstream: UpstreamConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
            shutdown_timeout_seconds: 30,
            database: DatabaseSettings::default(),
            redis_url: "redis://localhost:6379".to_string(),
            hotel_cache_seconds: 300,
            search: SearchIndexSettings::default(),
            sync: SyncSettings::default(),
            rate_limit: RateLimitSettings::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Load `.env` if present; missing files are not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("warning: failed to load .env file: {}", e);
        }
    }
}
