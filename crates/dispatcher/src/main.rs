//! Dispatcher service entrypoint.

use actix_web::{web, App, HttpServer};
use hotel_gateway_core::{config, observability};
use hotel_gateway_core::{connect_pool, run_migrations, GatewayConfig, JobPublisher};
use hotel_gateway_dispatcher::{Orchestrator, PostgresJobSource, QueuePublisherSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let settings = GatewayConfig::load()?;
    let dispatcher = settings.dispatcher;

    observability::init_logging("hotel-gateway-dispatcher", "info");

    let pool = connect_pool(&dispatcher.database).await?;
    run_migrations(&pool).await?;

    let publisher = JobPublisher::connect(&dispatcher.redis_url, &dispatcher.main_queue).await?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PostgresJobSource::new(pool)),
        Arc::new(QueuePublisherSink::new(publisher)),
        dispatcher.batch_size,
        Duration::from_millis(dispatcher.batch_delay_ms),
        dispatcher.max_retry_attempts,
    ));

    // One full enumeration per kind before the RPC surface comes up.
    let startup = orchestrator.clone();
    tokio::spawn(async move {
        startup.run_once().await;
    });

    let bind_addr = format!("{}:{}", dispatcher.host, dispatcher.port);
    info!(addr = %bind_addr, queue = %dispatcher.main_queue, "dispatcher listening");

    let state = web::Data::new(orchestrator);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(hotel_gateway_dispatcher::rpc::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("dispatcher shutdown complete");
    Ok(())
}
