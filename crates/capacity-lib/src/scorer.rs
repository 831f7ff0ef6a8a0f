//! Node health scoring
//!
//! Combines resource pressure, network errors and online status into a
//! single 0-100 score. CPU and memory pressure dominate the weighting.

use chrono::{DateTime, Utc};

use crate::models::{NodeHealth, NodeStats, NodeStatus};

const CPU_WEIGHT: f64 = 0.3;
const MEMORY_WEIGHT: f64 = 0.3;
const DISK_WEIGHT: f64 = 0.2;
const NETWORK_WEIGHT: f64 = 0.1;
const UPTIME_WEIGHT: f64 = 0.1;

/// Network sub-score when the node reported any network errors
const DEGRADED_NETWORK_SCORE: u8 = 80;

/// Overall health score of a node in `0..=100`
pub fn score(node: &NodeStats) -> u8 {
    let health = sub_scores(node);
    health.overall_score
}

/// Full health block for a node, stamped with `now`
pub fn evaluate(node: &NodeStats, now: DateTime<Utc>) -> NodeHealth {
    NodeHealth {
        last_check: Some(now),
        ..sub_scores(node)
    }
}

fn sub_scores(node: &NodeStats) -> NodeHealth {
    let cpu_score = pressure_score(node.resources.cpu.percentage);
    let memory_score = pressure_score(node.resources.memory.percentage);
    let disk_score = pressure_score(node.resources.disk.percentage);
    let network_score = if node.network.errors == 0 {
        100
    } else {
        DEGRADED_NETWORK_SCORE
    };
    let uptime_score = if node.status == NodeStatus::Online { 100 } else { 0 };

    let weighted = cpu_score as f64 * CPU_WEIGHT
        + memory_score as f64 * MEMORY_WEIGHT
        + disk_score as f64 * DISK_WEIGHT
        + network_score as f64 * NETWORK_WEIGHT
        + uptime_score as f64 * UPTIME_WEIGHT;

    NodeHealth {
        cpu_score,
        memory_score,
        disk_score,
        network_score,
        uptime_score,
        overall_score: weighted.round().clamp(0.0, 100.0) as u8,
        last_check: None,
    }
}

/// `100 - percentage`, floored at zero
fn pressure_score(percentage: u32) -> u8 {
    100u32.saturating_sub(percentage) as u8
}
