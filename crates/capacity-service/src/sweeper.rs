//! Background task that marks nodes offline once their telemetry goes stale

use crate::api::AppState;
use capacity_lib::health::{assess_telemetry, components};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub struct StaleSweeper {
    state: Arc<AppState>,
    stale_after: chrono::Duration,
    interval: Duration,
}

impl StaleSweeper {
    pub fn new(state: Arc<AppState>, stale_after: chrono::Duration, interval: Duration) -> Self {
        Self {
            state,
            stale_after,
            interval,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.interval);
        self.state
            .health_registry
            .register(components::STALE_SWEEPER)
            .await;

        info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.num_seconds(),
            "Starting stale node sweeper"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep_once(Utc::now()).await;
                }
                _ = shutdown.recv() => {
                    info!("Stale node sweeper shutting down");
                    break;
                }
            }
        }

        self.state
            .health_registry
            .set_degraded(components::STALE_SWEEPER, "Sweeper stopped")
            .await;
    }

    /// One sweep pass; returns the ids of nodes that went offline
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Vec<String> {
        let marked = self.state.store.mark_stale(now, self.stale_after);

        if marked.is_empty() {
            debug!("No stale nodes");
        } else {
            self.state.metrics.add_stale_nodes(marked.len() as u64);
            self.state.logger.log_stale_nodes(&marked);
            self.state.summary_cache.invalidate();
        }

        let nodes = self.state.store.snapshot();
        let online = nodes.iter().filter(|n| n.is_online()).count();
        self.state
            .health_registry
            .update(components::TELEMETRY_STORE, assess_telemetry(nodes.len(), online))
            .await;
        self.state
            .health_registry
            .set_healthy(components::STALE_SWEEPER)
            .await;

        marked
    }
}
