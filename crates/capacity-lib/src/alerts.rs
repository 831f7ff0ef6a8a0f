//! Node alert derivation
//!
//! Alerts are recomputed from every telemetry sample:
//! - memory, disk or cpu in the critical tier raise a warning, full raises critical
//! - any network errors raise a warning
//! - an offline or errored node raises a critical alert
//!
//! Alerts keyed by `<node_id>:<kind>` keep their original `created_at` while
//! the condition persists. Auto-resolving alerts disappear once the condition
//! clears; the rest stay open until acknowledged.

use chrono::{DateTime, Utc};

use crate::models::{AlertKind, AlertSeverity, NodeAlert, NodeStats, NodeStatus};
use crate::resource::{MetricStatus, ResourceMetric};

/// Rebuild the alert list of `node` against its current telemetry
pub fn evaluate_alerts(node: &NodeStats, now: DateTime<Utc>) -> Vec<NodeAlert> {
    let active = active_conditions(node);

    let mut alerts: Vec<NodeAlert> = Vec::with_capacity(active.len());

    for (kind, severity, message) in active {
        let id = alert_id(&node.node_id, kind);
        let created_at = node
            .alerts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.created_at)
            .unwrap_or(now);

        alerts.push(NodeAlert {
            id,
            kind,
            severity,
            message,
            created_at,
            auto_resolve: auto_resolves(kind),
        });
    }

    // Sticky alerts survive until acknowledged
    for previous in &node.alerts {
        if !previous.auto_resolve && !alerts.iter().any(|a| a.id == previous.id) {
            alerts.push(previous.clone());
        }
    }

    alerts
}

/// Remove an alert by id, returning whether it existed
pub fn acknowledge(node: &mut NodeStats, alert_id: &str) -> bool {
    let before = node.alerts.len();
    node.alerts.retain(|a| a.id != alert_id);
    node.alerts.len() != before
}

/// Alerts newly raised in `current` compared to `previous`
pub fn newly_raised<'a>(previous: &[NodeAlert], current: &'a [NodeAlert]) -> Vec<&'a NodeAlert> {
    current
        .iter()
        .filter(|a| !previous.iter().any(|p| p.id == a.id))
        .collect()
}

pub fn alert_id(node_id: &str, kind: AlertKind) -> String {
    format!("{}:{}", node_id, kind.as_str())
}

fn auto_resolves(kind: AlertKind) -> bool {
    // A node that errored stays flagged until someone looks at it
    !matches!(kind, AlertKind::NodeError)
}

fn active_conditions(node: &NodeStats) -> Vec<(AlertKind, AlertSeverity, String)> {
    let mut conditions = Vec::new();

    match node.status {
        NodeStatus::Offline => conditions.push((
            AlertKind::NodeOffline,
            AlertSeverity::Critical,
            format!("Node {} is offline", node.fqdn),
        )),
        NodeStatus::Error => conditions.push((
            AlertKind::NodeError,
            AlertSeverity::Critical,
            format!("Node {} reported an error state", node.fqdn),
        )),
        _ => {}
    }

    let resources = [
        (AlertKind::MemoryPressure, "Memory", &node.resources.memory),
        (AlertKind::DiskPressure, "Disk", &node.resources.disk),
        (AlertKind::CpuPressure, "CPU", &node.resources.cpu),
    ];
    for (kind, label, metric) in resources {
        if let Some(severity) = pressure_severity(metric) {
            conditions.push((
                kind,
                severity,
                format!("{} usage at {}% ({})", label, metric.percentage, metric.status),
            ));
        }
    }

    if node.network.errors > 0 {
        conditions.push((
            AlertKind::NetworkErrors,
            AlertSeverity::Warning,
            format!("{} network errors reported", node.network.errors),
        ));
    }

    conditions
}

fn pressure_severity(metric: &ResourceMetric) -> Option<AlertSeverity> {
    match metric.status {
        MetricStatus::Full => Some(AlertSeverity::Critical),
        MetricStatus::Critical => Some(AlertSeverity::Warning),
        MetricStatus::Healthy | MetricStatus::Warning => None,
    }
}
