//! Observability infrastructure for the capacity service
//!
//! Provides:
//! - Prometheus metrics (check and aggregation latency, fleet gauges, counters)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{
    AlertSeverity, CapacityCheckRequest, CapacityCheckResult, NodeAlert, NodeStatus,
};

/// Histogram buckets for in-process computations (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CapacityMetricsInner> = OnceLock::new();

struct CapacityMetricsInner {
    check_latency_seconds: Histogram,
    aggregation_latency_seconds: Histogram,
    capacity_checks: IntCounterVec,
    telemetry_samples: IntCounter,
    telemetry_rejected: IntCounter,
    stale_nodes_marked: IntCounter,
    nodes_tracked: IntGauge,
    nodes_online: IntGauge,
    locations_tracked: IntGauge,
}

impl CapacityMetricsInner {
    fn new() -> Self {
        Self {
            check_latency_seconds: register_histogram!(
                "cythro_capacity_check_latency_seconds",
                "Time spent evaluating a capacity check",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register check_latency_seconds"),

            aggregation_latency_seconds: register_histogram!(
                "cythro_capacity_aggregation_latency_seconds",
                "Time spent aggregating node telemetry into location summaries",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register aggregation_latency_seconds"),

            capacity_checks: register_int_counter_vec!(
                "cythro_capacity_checks_total",
                "Capacity checks evaluated, by outcome",
                &["outcome"]
            )
            .expect("Failed to register capacity_checks"),

            telemetry_samples: register_int_counter!(
                "cythro_capacity_telemetry_samples_total",
                "Telemetry samples applied to the store"
            )
            .expect("Failed to register telemetry_samples"),

            telemetry_rejected: register_int_counter!(
                "cythro_capacity_telemetry_rejected_total",
                "Telemetry samples rejected as invalid"
            )
            .expect("Failed to register telemetry_rejected"),

            stale_nodes_marked: register_int_counter!(
                "cythro_capacity_stale_nodes_marked_total",
                "Nodes marked offline after their telemetry went stale"
            )
            .expect("Failed to register stale_nodes_marked"),

            nodes_tracked: register_int_gauge!(
                "cythro_capacity_nodes_tracked",
                "Number of nodes with a telemetry record"
            )
            .expect("Failed to register nodes_tracked"),

            nodes_online: register_int_gauge!(
                "cythro_capacity_nodes_online",
                "Number of nodes currently online"
            )
            .expect("Failed to register nodes_online"),

            locations_tracked: register_int_gauge!(
                "cythro_capacity_locations_tracked",
                "Number of distinct locations with at least one node"
            )
            .expect("Failed to register locations_tracked"),
        }
    }
}

/// Capacity metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct CapacityMetrics {
    _private: (),
}

impl Default for CapacityMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CapacityMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CapacityMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a capacity check latency and its outcome
    pub fn observe_check(&self, duration_secs: f64, can_accommodate: bool) {
        self.inner().check_latency_seconds.observe(duration_secs);
        let outcome = if can_accommodate { "accommodated" } else { "rejected" };
        self.inner()
            .capacity_checks
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn observe_aggregation(&self, duration_secs: f64) {
        self.inner().aggregation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_telemetry_samples(&self) {
        self.inner().telemetry_samples.inc();
    }

    pub fn inc_telemetry_rejected(&self) {
        self.inner().telemetry_rejected.inc();
    }

    pub fn add_stale_nodes(&self, count: u64) {
        self.inner().stale_nodes_marked.inc_by(count);
    }

    /// Update fleet gauges from the latest snapshot
    pub fn set_fleet(&self, nodes: i64, online: i64, locations: i64) {
        self.inner().nodes_tracked.set(nodes);
        self.inner().nodes_online.set(online);
        self.inner().locations_tracked.set(locations);
    }
}

/// Structured logger for capacity events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            port = port,
            "Capacity service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Capacity service shutting down"
        );
    }

    pub fn log_capacity_check(&self, request: &CapacityCheckRequest, result: &CapacityCheckResult) {
        info!(
            event = "capacity_check",
            service = %self.service_name,
            location_id = ?request.location_id,
            node_id = ?request.node_id,
            required_memory = ?request.required_memory,
            required_disk = ?request.required_disk,
            required_cpu = ?request.required_cpu,
            can_accommodate = result.can_accommodate,
            location_status = %result.location_status,
            available_nodes = result.available_nodes,
            warnings = result.warnings.len(),
            "Capacity check evaluated"
        );
    }

    pub fn log_node_status_change(&self, node_id: &str, from: NodeStatus, to: NodeStatus) {
        if to == NodeStatus::Online {
            info!(
                event = "node_status_changed",
                service = %self.service_name,
                node_id = %node_id,
                from = %from,
                to = %to,
                "Node status changed"
            );
        } else {
            warn!(
                event = "node_status_changed",
                service = %self.service_name,
                node_id = %node_id,
                from = %from,
                to = %to,
                "Node left online status"
            );
        }
    }

    pub fn log_alert(&self, node_id: &str, alert: &NodeAlert) {
        match alert.severity {
            AlertSeverity::Critical => {
                warn!(
                    event = "alert_raised",
                    service = %self.service_name,
                    node_id = %node_id,
                    alert_id = %alert.id,
                    severity = %alert.severity,
                    message = %alert.message,
                    "Critical node alert raised"
                );
            }
            _ => {
                info!(
                    event = "alert_raised",
                    service = %self.service_name,
                    node_id = %node_id,
                    alert_id = %alert.id,
                    severity = %alert.severity,
                    message = %alert.message,
                    "Node alert raised"
                );
            }
        }
    }

    pub fn log_stale_nodes(&self, node_ids: &[String]) {
        warn!(
            event = "nodes_marked_stale",
            service = %self.service_name,
            count = node_ids.len(),
            node_ids = ?node_ids,
            "Marked nodes offline after missing telemetry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_metrics_creation() {
        let metrics = CapacityMetrics::new();

        metrics.observe_check(0.0001, true);
        metrics.observe_check(0.0002, false);
        metrics.observe_aggregation(0.0003);
        metrics.inc_telemetry_samples();
        metrics.inc_telemetry_rejected();
        metrics.add_stale_nodes(2);
        metrics.set_fleet(3, 2, 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("capacity-service");
        assert_eq!(logger.service_name, "capacity-service");
    }
}
