//! Capacity service
//!
//! Accepts node telemetry, answers capacity checks and serves the
//! monitoring summary for the hosting dashboard.

use anyhow::Result;
use capacity_lib::{
    health::{components, HealthRegistry},
    observability::{CapacityMetrics, StructuredLogger},
    CapacityChecker, CheckOptions, TelemetryStore,
};
use capacity_service::{api, config::ServiceConfig, sweeper::StaleSweeper};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        api_port = config.api_port,
        stale_after_secs = config.stale_after_secs,
        "Capacity service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::TELEMETRY_STORE).await;
    health_registry.register(components::AGGREGATOR).await;

    let metrics = CapacityMetrics::new();
    let logger = StructuredLogger::new("capacity-service");

    let checker = CapacityChecker::new(CheckOptions {
        max_recommendations: config.max_recommendations,
    });
    let app_state = Arc::new(api::AppState::new(
        Arc::new(TelemetryStore::new()),
        checker,
        health_registry.clone(),
        metrics,
        config.summary_cache_ttl(),
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sweeper = StaleSweeper::new(
        app_state.clone(),
        chrono::Duration::from_std(config.stale_after())?,
        config.sweep_interval(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_tx.subscribe()));

    let mut api_shutdown = shutdown_tx.subscribe();
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, async move {
        let _ = api_shutdown.recv().await;
    }));

    health_registry.set_ready(true).await;
    logger.log_startup(SERVICE_VERSION, config.api_port);

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    let _ = shutdown_tx.send(());
    sweeper_handle.await?;
    api_handle.await??;

    info!("Shutdown complete");
    Ok(())
}
