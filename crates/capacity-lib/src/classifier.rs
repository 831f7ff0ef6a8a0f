//! Capacity classification
//!
//! Answers "can this node or location take a new workload". Uses its own
//! thresholds (95/80), distinct from the per-resource tiers in
//! [`crate::resource`].

use serde::{Deserialize, Serialize};

use crate::models::{CapacityPlan, NodeStats, ResourceEnvelope};

/// Max usage percentage at or above which a node is full
pub const CAPACITY_FULL_PERCENT: u32 = 95;

/// Max usage percentage at or above which a node is limited
pub const CAPACITY_LIMITED_PERCENT: u32 = 80;

/// Share of `max_servers` recommended for steady-state allocation
const RECOMMENDED_SERVER_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    Available,
    Limited,
    Full,
    Maintenance,
}

impl CapacityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityStatus::Available => "available",
            CapacityStatus::Limited => "limited",
            CapacityStatus::Full => "full",
            CapacityStatus::Maintenance => "maintenance",
        }
    }

    /// Whether new work may still be placed under this status
    pub fn accepts_work(&self) -> bool {
        matches!(self, CapacityStatus::Available | CapacityStatus::Limited)
    }
}

impl std::fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify by the highest usage percentage across resources
pub fn classify(max_usage_percentage: u32) -> CapacityStatus {
    if max_usage_percentage >= CAPACITY_FULL_PERCENT {
        CapacityStatus::Full
    } else if max_usage_percentage >= CAPACITY_LIMITED_PERCENT {
        CapacityStatus::Limited
    } else {
        CapacityStatus::Available
    }
}

/// Classify with the maintenance override applied first
pub fn classify_with_maintenance(max_usage_percentage: u32, maintenance: bool) -> CapacityStatus {
    if maintenance {
        CapacityStatus::Maintenance
    } else {
        classify(max_usage_percentage)
    }
}

pub fn classify_node(node: &NodeStats) -> CapacityStatus {
    classify_with_maintenance(node.resources.max_usage_percentage(), node.in_maintenance())
}

/// Whether the node alone can host the whole envelope.
///
/// The node must be online, out of maintenance, and have enough free memory,
/// disk and cpu at the same time.
pub fn can_accept_new_servers(node: &NodeStats, required: &ResourceEnvelope) -> bool {
    if !node.is_online() || node.in_maintenance() {
        return false;
    }

    let resources = &node.resources;
    resources.memory.fits(required.memory)
        && resources.disk.fits(required.disk)
        && resources.cpu.fits(required.cpu)
}

/// Capacity planning block derived from the node's server limit and count
pub fn plan_capacity(node: &NodeStats) -> CapacityPlan {
    let max_servers = node.capacity.max_servers;
    if max_servers == 0 {
        return CapacityPlan::default();
    }

    let recommended = (max_servers as f64 * RECOMMENDED_SERVER_RATIO).floor() as u32;
    let allocation = (node.servers.total as f64 / max_servers as f64 * 100.0).round() as u32;

    CapacityPlan {
        max_servers,
        recommended_max_servers: recommended,
        allocation_percentage: allocation,
    }
}
