//! Worker service entrypoint.
//!
//! Horizontally scaled: every instance joins the same consumer group and
//! shares the queue. Shutdown closes the consumer first, then the cache
//! and lock clients go down with the process.

use hotel_gateway_core::{config, observability, shutdown};
use hotel_gateway_core::{
    connect_pool, run_migrations, GatewayConfig, JobConsumer, PropertyApiClient, RedisCache,
    RedisLock,
};
use hotel_gateway_worker::{MessageProcessor, PostgresWorkerRepository, WorkerConsumer};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let settings = GatewayConfig::load()?;
    let worker = settings.worker;

    observability::init_logging("hotel-gateway-worker", "info");

    let pool = connect_pool(&worker.database).await?;
    run_migrations(&pool).await?;

    let cache = RedisCache::connect(&worker.redis_url).await?;
    let lock = RedisLock::from_manager(cache.manager());

    let upstream = Arc::new(PropertyApiClient::new(&worker.upstream)?);

    let queue = JobConsumer::connect(
        &worker.redis_url,
        &worker.main_queue,
        worker.prefetch_count,
        Duration::from_millis(worker.consumer_block_ms),
    )
    .await?;

    let processor = Arc::new(MessageProcessor::new(
        Arc::new(PostgresWorkerRepository::new(pool)),
        upstream,
        Arc::new(cache),
        Arc::new(lock),
        worker.ttl,
    ));

    let consumer = WorkerConsumer::new(queue.clone(), processor);
    let health = tokio::spawn(WorkerConsumer::run_health_checks(queue));

    info!(queue = %worker.main_queue, prefetch = worker.prefetch_count, "worker started");

    tokio::select! {
        _ = consumer.run() => {}
        _ = shutdown::shutdown_signal() => {}
    }

    health.abort();
    info!("worker shutdown complete");
    Ok(())
}
