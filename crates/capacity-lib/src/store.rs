//! In-memory telemetry store
//!
//! Owns the [`NodeStats`] of every monitored node and applies the node
//! lifecycle: a default-zero record on first contact, a full rebuild of the
//! derived blocks on every sample, and an offline mark for nodes that stop
//! reporting. Nodes are never removed.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alerts::{self, evaluate_alerts, newly_raised};
use crate::classifier::plan_capacity;
use crate::error::{CapacityError, Result};
use crate::history::HistoryBucket;
use crate::models::{
    NetworkStats, NodeAlert, NodeStats, NodeStatus, PerformanceStats, ServerCounts,
};
use crate::resource::ResourceMetric;
use crate::scorer;

/// Raw `(total, used)` pair as reported by the node agent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawUsage {
    pub total: f64,
    pub used: f64,
}

impl RawUsage {
    pub fn new(total: f64, used: f64) -> Self {
        Self { total, used }
    }

    fn metric(&self) -> ResourceMetric {
        ResourceMetric::build(self.total, self.used)
    }
}

fn default_reported_status() -> NodeStatus {
    NodeStatus::Online
}

/// One telemetry poll for one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub location_id: String,
    pub fqdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_reported_status")]
    pub status: NodeStatus,
    pub memory: RawUsage,
    pub disk: RawUsage,
    pub cpu: RawUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<RawUsage>,
    #[serde(default)]
    pub network: NetworkStats,
    #[serde(default)]
    pub servers: ServerCounts,
    #[serde(default)]
    pub performance: PerformanceStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_servers: Option<u32>,
}

/// What changed when a sample was applied
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub node: NodeStats,
    pub previous_status: NodeStatus,
    pub raised_alerts: Vec<NodeAlert>,
}

impl IngestOutcome {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.node.status
    }
}

#[derive(Debug, Default)]
pub struct TelemetryStore {
    nodes: DashMap<String, NodeStats>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin monitoring a node. An existing record is left untouched.
    pub fn start_monitoring(
        &self,
        node_id: &str,
        location_id: &str,
        fqdn: &str,
    ) -> Result<NodeStats> {
        validate_ids(node_id, location_id)?;

        let entry = self.nodes.entry(node_id.to_string()).or_insert_with(|| {
            info!(node_id = %node_id, location_id = %location_id, "Started monitoring node");
            NodeStats::new(node_id, location_id, fqdn)
        });
        Ok(entry.value().clone())
    }

    /// Apply a telemetry sample, creating the node on first contact
    pub fn ingest(
        &self,
        node_id: &str,
        sample: TelemetrySample,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        validate_ids(node_id, &sample.location_id)?;

        let mut entry = self
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| NodeStats::new(node_id, &sample.location_id, &sample.fqdn));
        let node = entry.value_mut();

        let previous_status = node.status;
        let previous_alerts = node.alerts.clone();

        node.location_id = sample.location_id;
        node.fqdn = sample.fqdn;
        if sample.name.is_some() {
            node.name = sample.name;
        }
        node.status = if node.in_maintenance() {
            NodeStatus::Maintenance
        } else {
            sample.status
        };

        node.resources.memory = sample.memory.metric();
        node.resources.disk = sample.disk.metric();
        node.resources.cpu = sample.cpu.metric();
        node.resources.swap = sample.swap.map(|s| s.metric());
        node.network = sample.network;
        node.servers = sample.servers;
        node.performance = sample.performance;
        if let Some(max_servers) = sample.max_servers {
            node.capacity.max_servers = max_servers;
        }

        refresh_derived(node, now);
        node.history.record(
            now,
            HistoryBucket {
                cpu_percent: node.resources.cpu.percentage,
                memory_percent: node.resources.memory.percentage,
                disk_percent: node.resources.disk.percentage,
                server_count: node.servers.total,
                recorded_at: None,
            },
        );
        node.last_updated = Some(now);

        let raised_alerts = newly_raised(&previous_alerts, &node.alerts)
            .into_iter()
            .cloned()
            .collect();

        debug!(
            node_id = %node_id,
            status = %node.status,
            health = node.health.overall_score,
            "Applied telemetry sample"
        );

        Ok(IngestOutcome {
            node: node.clone(),
            previous_status,
            raised_alerts,
        })
    }

    /// Toggle maintenance mode; the node returns to online when it is cleared
    pub fn set_maintenance(
        &self,
        node_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<NodeStats> {
        let mut entry = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CapacityError::UnknownNode(node_id.to_string()))?;
        let node = entry.value_mut();

        node.configuration.maintenance_mode = enabled;
        if enabled {
            node.status = NodeStatus::Maintenance;
        } else if node.status == NodeStatus::Maintenance {
            node.status = NodeStatus::Online;
        }
        refresh_derived(node, now);

        info!(node_id = %node_id, enabled, "Maintenance mode changed");
        Ok(node.clone())
    }

    /// Mark nodes offline whose last sample is older than `max_age`.
    ///
    /// Nodes in maintenance and nodes already offline are skipped. Returns the
    /// ids of the nodes that changed.
    pub fn mark_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<String> {
        let cutoff = now - max_age;
        let mut marked = Vec::new();

        for mut entry in self.nodes.iter_mut() {
            let node = entry.value_mut();
            if node.status == NodeStatus::Offline || node.in_maintenance() {
                continue;
            }
            let stale = node.last_updated.map(|t| t < cutoff).unwrap_or(true);
            if stale {
                node.status = NodeStatus::Offline;
                refresh_derived(node, now);
                marked.push(node.node_id.clone());
            }
        }

        marked.sort();
        marked
    }

    pub fn acknowledge_alert(&self, node_id: &str, alert_id: &str) -> Result<NodeStats> {
        let mut entry = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CapacityError::UnknownNode(node_id.to_string()))?;

        if !alerts::acknowledge(entry.value_mut(), alert_id) {
            return Err(CapacityError::UnknownAlert {
                node_id: node_id.to_string(),
                alert_id: alert_id.to_string(),
            });
        }
        Ok(entry.value().clone())
    }

    pub fn get(&self, node_id: &str) -> Option<NodeStats> {
        self.nodes.get(node_id).map(|n| n.value().clone())
    }

    /// Copy of every node, ordered by node id
    pub fn snapshot(&self) -> Vec<NodeStats> {
        let mut nodes: Vec<NodeStats> = self.nodes.iter().map(|n| n.value().clone()).collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn validate_ids(node_id: &str, location_id: &str) -> Result<()> {
    if node_id.trim().is_empty() {
        return Err(CapacityError::InvalidTelemetry("node_id must not be empty".to_string()));
    }
    if location_id.trim().is_empty() {
        return Err(CapacityError::InvalidTelemetry(
            "location_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Recompute health, capacity plan and alerts from the node's current state
fn refresh_derived(node: &mut NodeStats, now: DateTime<Utc>) {
    node.health = scorer::evaluate(node, now);
    node.capacity = plan_capacity(node);
    node.alerts = evaluate_alerts(node, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertKind;

    fn sample(location: &str, mem_used: f64) -> TelemetrySample {
        TelemetrySample {
            location_id: location.to_string(),
            fqdn: "node1.example.com".to_string(),
            name: Some("Node 1".to_string()),
            status: NodeStatus::Online,
            memory: RawUsage::new(8192.0, mem_used),
            disk: RawUsage::new(100_000.0, 20_000.0),
            cpu: RawUsage::new(400.0, 40.0),
            swap: None,
            network: NetworkStats::default(),
            servers: ServerCounts {
                total: 4,
                running: 3,
                stopped: 1,
                ..Default::default()
            },
            performance: PerformanceStats::default(),
            max_servers: Some(20),
        }
    }

    #[test]
    fn test_start_monitoring_creates_default_zero_record() {
        let store = TelemetryStore::new();
        let node = store.start_monitoring("n1", "eu", "n1.example.com").unwrap();

        assert_eq!(node.status, NodeStatus::Offline);
        assert_eq!(node.resources.memory.total, 0.0);
        assert!(node.last_updated.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_start_monitoring_does_not_reset_existing() {
        let store = TelemetryStore::new();
        store.ingest("n1", sample("eu", 1024.0), Utc::now()).unwrap();
        let node = store.start_monitoring("n1", "eu", "n1.example.com").unwrap();
        assert_eq!(node.status, NodeStatus::Online);
    }

    #[test]
    fn test_ingest_rebuilds_derived_blocks() {
        let store = TelemetryStore::new();
        let now = Utc::now();
        let outcome = store.ingest("n1", sample("eu", 2048.0), now).unwrap();
        // first contact moves the node from its default offline status
        assert!(outcome.status_changed());

        let node = outcome.node;
        assert_eq!(node.status, NodeStatus::Online);
        assert_eq!(node.resources.memory.percentage, 25);
        assert_eq!(node.capacity.recommended_max_servers, 16);
        assert_eq!(node.capacity.allocation_percentage, 20);
        assert_eq!(node.health.last_check, Some(now));
        assert_eq!(node.history.filled(now), 1);
        assert_eq!(node.last_updated, Some(now));
    }

    #[test]
    fn test_ingest_reports_new_alerts_once() {
        let store = TelemetryStore::new();
        let outcome = store.ingest("n1", sample("eu", 8000.0), Utc::now()).unwrap();
        assert_eq!(outcome.raised_alerts.len(), 1);
        assert_eq!(outcome.raised_alerts[0].kind, AlertKind::MemoryPressure);

        let outcome = store.ingest("n1", sample("eu", 8000.0), Utc::now()).unwrap();
        assert!(outcome.raised_alerts.is_empty());
        assert_eq!(outcome.node.alerts.len(), 1);
    }

    #[test]
    fn test_ingest_rejects_empty_ids() {
        let store = TelemetryStore::new();
        assert!(matches!(
            store.ingest("", sample("eu", 0.0), Utc::now()),
            Err(CapacityError::InvalidTelemetry(_))
        ));
        assert!(matches!(
            store.ingest("n1", sample(" ", 0.0), Utc::now()),
            Err(CapacityError::InvalidTelemetry(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_maintenance_overrides_reported_status() {
        let store = TelemetryStore::new();
        store.ingest("n1", sample("eu", 0.0), Utc::now()).unwrap();

        let node = store.set_maintenance("n1", true, Utc::now()).unwrap();
        assert_eq!(node.status, NodeStatus::Maintenance);

        let outcome = store.ingest("n1", sample("eu", 0.0), Utc::now()).unwrap();
        assert_eq!(outcome.node.status, NodeStatus::Maintenance);

        let node = store.set_maintenance("n1", false, Utc::now()).unwrap();
        assert_eq!(node.status, NodeStatus::Online);
        assert!(!node.configuration.maintenance_mode);
    }

    #[test]
    fn test_set_maintenance_unknown_node() {
        let store = TelemetryStore::new();
        assert!(matches!(
            store.set_maintenance("ghost", true, Utc::now()),
            Err(CapacityError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_mark_stale_marks_offline_but_keeps_node() {
        let store = TelemetryStore::new();
        let then = Utc::now() - Duration::minutes(10);
        store.ingest("old", sample("eu", 0.0), then).unwrap();
        store.ingest("fresh", sample("eu", 0.0), Utc::now()).unwrap();
        store.ingest("maint", sample("eu", 0.0), then).unwrap();
        store.set_maintenance("maint", true, then).unwrap();

        let marked = store.mark_stale(Utc::now(), Duration::minutes(2));
        assert_eq!(marked, vec!["old".to_string()]);

        let old = store.get("old").unwrap();
        assert_eq!(old.status, NodeStatus::Offline);
        assert!(old.alerts.iter().any(|a| a.kind == AlertKind::NodeOffline));
        assert_eq!(store.len(), 3);

        // second sweep finds nothing new
        assert!(store.mark_stale(Utc::now(), Duration::minutes(2)).is_empty());
    }

    #[test]
    fn test_acknowledge_alert() {
        let store = TelemetryStore::new();
        let mut s = sample("eu", 0.0);
        s.status = NodeStatus::Error;
        store.ingest("n1", s, Utc::now()).unwrap();

        let node = store.acknowledge_alert("n1", "n1:node_error").unwrap();
        assert!(node.alerts.is_empty());

        assert!(matches!(
            store.acknowledge_alert("n1", "n1:node_error"),
            Err(CapacityError::UnknownAlert { .. })
        ));
    }

    #[test]
    fn test_snapshot_sorted_by_id() {
        let store = TelemetryStore::new();
        for id in ["c", "a", "b"] {
            store.ingest(id, sample("eu", 0.0), Utc::now()).unwrap();
        }
        let ids: Vec<String> = store.snapshot().into_iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
