//! Scheduler service entrypoint.

use hotel_gateway_core::{config, observability, shutdown, GatewayConfig};
use hotel_gateway_scheduler::Scheduler;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let settings = GatewayConfig::load()?;

    observability::init_logging("hotel-gateway-scheduler", "info");

    let scheduler = Scheduler::new(settings.scheduler.clone())?;
    info!(
        dispatcher = %format!(
            "{}:{}",
            settings.scheduler.dispatcher_host, settings.scheduler.dispatcher_port
        ),
        "scheduler started"
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = shutdown::shutdown_signal() => {}
    }

    info!("scheduler shutdown complete");
    Ok(())
}
