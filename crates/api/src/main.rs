//! Read API service entrypoint.

use actix_web::{web, App, HttpServer};
use hotel_gateway_api::{
    handlers, rate_limit::RateLimitMiddleware, AppState, HotelReadRepository, SyncService,
    TypesenseIndex,
};
use hotel_gateway_core::{config, observability};
use hotel_gateway_core::{
    connect_pool, run_migrations, GatewayConfig, PropertyApiClient, RedisCache,
};
use hotel_gateway_worker::PostgresWorkerRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let settings = GatewayConfig::load()?;
    let api = settings.api;

    observability::init_logging("hotel-gateway-api", "info");

    let pool = connect_pool(&api.database).await?;
    run_migrations(&pool).await?;

    let cache = RedisCache::connect(&api.redis_url).await?;
    let upstream = Arc::new(PropertyApiClient::new(&api.upstream)?);

    let index = Arc::new(TypesenseIndex::new(&api.search)?);
    if let Err(e) = index.ensure_collection().await {
        warn!(error = %e, "search collection initialization failed; continuing");
    }
    let index: Arc<dyn hotel_gateway_api::SearchEngine> = index;

    let read_repo = HotelReadRepository::new(pool.clone());
    let sync = Arc::new(SyncService::new(
        read_repo.clone(),
        index.clone(),
        cache.clone(),
        api.sync.batch_size,
        Duration::from_millis(api.sync.batch_pause_ms),
    ));

    let state = web::Data::new(AppState {
        read_repo,
        write_repo: Arc::new(PostgresWorkerRepository::new(pool)),
        cache,
        upstream,
        index,
        sync,
        hotel_cache_ttl: Duration::from_secs(api.hotel_cache_seconds),
    });

    let bind_addr = format!("{}:{}", api.host, api.port);
    info!(addr = %bind_addr, "read API listening");

    let limiter = hotel_gateway_api::rate_limit::shared_limiter(&api.rate_limit);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(RateLimitMiddleware::from_limiter(limiter.clone()))
            .route("/health", web::get().to(handlers::health))
            .configure(handlers::configure)
    })
    .workers(api.workers.unwrap_or_else(num_cpus::get))
    .shutdown_timeout(api.shutdown_timeout_seconds)
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("read API shutdown complete");
    Ok(())
}
