//! Shared application state for the HTTP handlers.

use crate::repository::HotelReadRepository;
use crate::search::SearchEngine;
use crate::sync::SyncService;
use hotel_gateway_core::{PropertyApiClient, RedisCache};
use hotel_gateway_worker::WorkerRepository;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub read_repo: HotelReadRepository,
    pub write_repo: Arc<dyn WorkerRepository>,
    pub cache: RedisCache,
    pub upstream: Arc<PropertyApiClient>,
    pub index: Arc<dyn SearchEngine>,
    pub sync: Arc<SyncService>,
    pub hotel_cache_ttl: Duration,
}
