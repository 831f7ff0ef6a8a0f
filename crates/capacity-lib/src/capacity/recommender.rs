//! Candidate node ranking
//!
//! Each node that can host the workload gets two scores:
//! - `load_score`: 100 minus its mean current utilization
//! - `fit_score`: how close the tightest remaining headroom after placement
//!   is to [`TARGET_HEADROOM_PERCENT`]
//!
//! Candidates are ordered by `0.6 * load + 0.4 * fit`, then by load, then by
//! node id.

use std::cmp::Ordering;

use crate::classifier::can_accept_new_servers;
use crate::models::{NodeStats, RecommendedNode, ResourceEnvelope};
use crate::resource::ResourceMetric;

/// Headroom after placement that earns a perfect fit score
pub const TARGET_HEADROOM_PERCENT: f64 = 30.0;

const LOAD_WEIGHT: f64 = 0.6;
const FIT_WEIGHT: f64 = 0.4;

/// Rank the nodes able to host `required`, best first, keeping at most `limit`
pub fn recommend(
    nodes: &[&NodeStats],
    required: &ResourceEnvelope,
    limit: usize,
) -> Vec<RecommendedNode> {
    let mut candidates: Vec<(f64, RecommendedNode)> = nodes
        .iter()
        .filter(|node| can_accept_new_servers(node, required))
        .map(|node| {
            let load = load_score(node);
            let fit = fit_score(node, required);
            (
                rank_score(load, fit),
                RecommendedNode {
                    node_id: node.node_id.clone(),
                    load_score: load,
                    fit_score: fit,
                },
            )
        })
        .collect();

    candidates.sort_by(|(rank_a, a), (rank_b, b)| {
        rank_b
            .partial_cmp(rank_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.load_score.cmp(&a.load_score))
            .then_with(|| a.node_id.cmp(&b.node_id))
    });

    candidates
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate)
        .collect()
}

/// Combined ranking value of a candidate
pub fn rank_score(load_score: u8, fit_score: u8) -> f64 {
    load_score as f64 * LOAD_WEIGHT + fit_score as f64 * FIT_WEIGHT
}

/// `100 - mean(memory%, disk%, cpu%)`, floored at zero
pub fn load_score(node: &NodeStats) -> u8 {
    let r = &node.resources;
    // overcommitted nodes can report percentages near u32::MAX
    let mean = (r.memory.percentage as f64 + r.disk.percentage as f64 + r.cpu.percentage as f64)
        / 3.0;
    (100.0 - mean).round().clamp(0.0, 100.0) as u8
}

/// Score the tightest post-placement headroom against the target margin.
///
/// Headroom of exactly the target scores 100. Both a nearly exhausted node and
/// a nearly empty one score lower.
pub fn fit_score(node: &NodeStats, required: &ResourceEnvelope) -> u8 {
    let r = &node.resources;
    let headroom = [
        headroom_after(&r.memory, required.memory),
        headroom_after(&r.disk, required.disk),
        headroom_after(&r.cpu, required.cpu),
    ]
    .into_iter()
    .flatten()
    .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.min(h))))
    .unwrap_or(0.0);

    let penalty_per_point = 100.0 / (100.0 - TARGET_HEADROOM_PERCENT);
    let distance = (headroom - TARGET_HEADROOM_PERCENT).abs();
    (100.0 - distance * penalty_per_point).round().clamp(0.0, 100.0) as u8
}

/// Percent of `metric.total` left after taking `required`, `None` if unknown
fn headroom_after(metric: &ResourceMetric, required: f64) -> Option<f64> {
    if metric.total <= 0.0 {
        return None;
    }
    Some(((metric.available - required.max(0.0)) / metric.total * 100.0).max(0.0))
}
