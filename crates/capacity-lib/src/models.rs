//! Core data models for node telemetry and capacity results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::CapacityStatus;
use crate::history::NodeHistory;
use crate::resource::ResourceMetric;

/// Lifecycle status of a monitored node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    #[default]
    Offline,
    Maintenance,
    Overloaded,
    Error,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Maintenance => "maintenance",
            NodeStatus::Overloaded => "overloaded",
            NodeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(NodeStatus::Online),
            "offline" => Ok(NodeStatus::Offline),
            "maintenance" => Ok(NodeStatus::Maintenance),
            "overloaded" => Ok(NodeStatus::Overloaded),
            "error" => Ok(NodeStatus::Error),
            other => Err(format!("unknown node status: {}", other)),
        }
    }
}

/// Per-resource metrics of a node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeResources {
    pub memory: ResourceMetric,
    pub disk: ResourceMetric,
    pub cpu: ResourceMetric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<ResourceMetric>,
}

impl NodeResources {
    /// Highest usage percentage across memory, disk and cpu
    pub fn max_usage_percentage(&self) -> u32 {
        self.memory
            .percentage
            .max(self.disk.percentage)
            .max(self.cpu.percentage)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub errors: u64,
}

/// Game servers hosted on a node, by state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCounts {
    pub total: u32,
    pub running: u32,
    pub stopped: u32,
    pub suspended: u32,
    pub installing: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// 1, 5 and 15 minute load averages
    pub load_average: [f64; 3],
    pub uptime_secs: u64,
    pub process_count: u32,
    pub thread_count: u32,
}

/// Capacity planning block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityPlan {
    pub max_servers: u32,
    pub recommended_max_servers: u32,
    pub allocation_percentage: u32,
}

/// Health block, all scores in `0..=100`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    pub cpu_score: u8,
    pub memory_score: u8,
    pub disk_score: u8,
    pub network_score: u8,
    pub uptime_score: u8,
    pub overall_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfiguration {
    pub maintenance_mode: bool,
    /// Percent of memory the panel may overallocate
    #[serde(default)]
    pub overallocate_memory: i32,
    /// Percent of disk the panel may overallocate
    #[serde(default)]
    pub overallocate_disk: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Condition an alert was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    MemoryPressure,
    DiskPressure,
    CpuPressure,
    NetworkErrors,
    NodeOffline,
    NodeError,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::MemoryPressure => "memory_pressure",
            AlertKind::DiskPressure => "disk_pressure",
            AlertKind::CpuPressure => "cpu_pressure",
            AlertKind::NetworkErrors => "network_errors",
            AlertKind::NodeOffline => "node_offline",
            AlertKind::NodeError => "node_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAlert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub auto_resolve: bool,
}

/// Telemetry-derived state of one compute node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStats {
    pub node_id: String,
    pub location_id: String,
    pub fqdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: NodeStatus,
    pub resources: NodeResources,
    #[serde(default)]
    pub network: NetworkStats,
    #[serde(default)]
    pub servers: ServerCounts,
    #[serde(default)]
    pub performance: PerformanceStats,
    #[serde(default)]
    pub capacity: CapacityPlan,
    #[serde(default)]
    pub health: NodeHealth,
    #[serde(default)]
    pub configuration: NodeConfiguration,
    #[serde(default)]
    pub alerts: Vec<NodeAlert>,
    #[serde(default)]
    pub history: NodeHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl NodeStats {
    /// Default-zero record for a node whose monitoring has just started
    pub fn new(
        node_id: impl Into<String>,
        location_id: impl Into<String>,
        fqdn: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            location_id: location_id.into(),
            fqdn: fqdn.into(),
            name: None,
            status: NodeStatus::Offline,
            resources: NodeResources::default(),
            network: NetworkStats::default(),
            servers: ServerCounts::default(),
            performance: PerformanceStats::default(),
            capacity: CapacityPlan::default(),
            health: NodeHealth::default(),
            configuration: NodeConfiguration::default(),
            alerts: Vec::new(),
            history: NodeHistory::default(),
            last_updated: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    pub fn in_maintenance(&self) -> bool {
        self.configuration.maintenance_mode
    }
}

/// Resource envelope requested for a new server
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    pub memory: f64,
    pub disk: f64,
    pub cpu: f64,
}

impl ResourceEnvelope {
    pub fn new(memory: f64, disk: f64, cpu: f64) -> Self {
        Self { memory, disk, cpu }
    }
}

/// Memory, disk and cpu amounts summed over a set of nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityTotals {
    pub memory: f64,
    pub disk: f64,
    pub cpu: f64,
}

impl CapacityTotals {
    pub fn add(&mut self, memory: f64, disk: f64, cpu: f64) {
        self.memory += memory;
        self.disk += disk;
        self.cpu += cpu;
    }
}

/// Derived capacity summary of one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAggregate {
    pub location_id: String,
    pub total_nodes: u32,
    pub online_nodes: u32,
    pub available_nodes: u32,
    pub total_capacity: CapacityTotals,
    pub used_capacity: CapacityTotals,
    pub total_servers: u32,
    pub average_health_score: u8,
    pub status: CapacityStatus,
}

/// Capacity check query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacityCheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_memory: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_disk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_cpu: Option<f64>,
    #[serde(default)]
    pub include_recommendations: bool,
}

impl CapacityCheckRequest {
    /// Requested envelope, missing amounts count as zero
    pub fn envelope(&self) -> ResourceEnvelope {
        ResourceEnvelope {
            memory: self.required_memory.unwrap_or(0.0),
            disk: self.required_disk.unwrap_or(0.0),
            cpu: self.required_cpu.unwrap_or(0.0),
        }
    }
}

/// Projected utilization percentages once the workload is placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationProjection {
    pub memory: u32,
    pub disk: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedNode {
    pub node_id: String,
    /// Higher means less loaded today
    pub load_score: u8,
    /// Higher means the remaining headroom after placement is moderate
    pub fit_score: u8,
}

/// Result of a capacity check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityCheckResult {
    pub can_accommodate: bool,
    pub location_status: CapacityStatus,
    pub available_nodes: u32,
    pub total_capacity: CapacityTotals,
    pub available_capacity: CapacityTotals,
    pub utilization_after_creation: UtilizationProjection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_nodes: Option<Vec<RecommendedNode>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
