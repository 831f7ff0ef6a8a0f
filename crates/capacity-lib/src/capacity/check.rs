//! Capacity check
//!
//! Resolves the scope of a request (one node, or every node of a location),
//! decides whether any single node can host the workload, and projects the
//! location's utilization after creation. Unresolvable scopes produce a
//! non-accommodating result with a warning, never an error.

use tracing::debug;

use super::recommender::recommend;
use crate::aggregator::{is_available, location_status};
use crate::classifier::{
    can_accept_new_servers, classify_node, CapacityStatus, CAPACITY_FULL_PERCENT,
};
use crate::models::{
    CapacityCheckRequest, CapacityCheckResult, CapacityTotals, NodeStats, ResourceEnvelope,
    UtilizationProjection,
};
use crate::resource::usage_percentage;

/// Default number of recommended nodes returned
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub max_recommendations: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }
}

/// Resolved target of a capacity check
struct Scope<'a> {
    /// Nodes that may receive the workload
    candidates: Vec<&'a NodeStats>,
    /// Nodes of the location used for the utilization projection
    location: Vec<&'a NodeStats>,
}

#[derive(Debug, Clone, Default)]
pub struct CapacityChecker {
    options: CheckOptions,
}

impl CapacityChecker {
    pub fn new(options: CheckOptions) -> Self {
        Self { options }
    }

    /// Run a capacity check against a telemetry snapshot
    pub fn check(&self, nodes: &[NodeStats], request: &CapacityCheckRequest) -> CapacityCheckResult {
        let required = request.envelope();

        let scope = match resolve_scope(nodes, request) {
            Ok(scope) => scope,
            Err(warning) => {
                debug!(
                    location_id = ?request.location_id,
                    node_id = ?request.node_id,
                    "Capacity check scope did not resolve"
                );
                return unresolved(warning, request.include_recommendations);
            }
        };

        let mut warnings = Vec::new();

        let can_accommodate = scope
            .candidates
            .iter()
            .any(|node| can_accept_new_servers(node, &required));
        let available_nodes = scope.candidates.iter().filter(|n| is_available(n)).count() as u32;

        let mut total_capacity = CapacityTotals::default();
        let mut used_capacity = CapacityTotals::default();
        let mut available_capacity = CapacityTotals::default();
        for node in &scope.candidates {
            let r = &node.resources;
            total_capacity.add(r.memory.total, r.disk.total, r.cpu.total);
            used_capacity.add(r.memory.used, r.disk.used, r.cpu.used);
            available_capacity.add(r.memory.available, r.disk.available, r.cpu.available);
        }

        let location_status = location_status(&scope.candidates, &total_capacity, &used_capacity);
        let utilization_after_creation = project_utilization(&scope.location, &required);

        let ranked = recommend(&scope.candidates, &required, scope.candidates.len());

        if location_status == CapacityStatus::Maintenance {
            warnings.push("All nodes in scope are in maintenance mode".to_string());
        }

        if !can_accommodate && location_status != CapacityStatus::Maintenance {
            if pooled_capacity_suffices(&available_capacity, &required) {
                warnings.push(
                    "Combined free capacity is sufficient but no single node can host the server"
                        .to_string(),
                );
            } else {
                warnings
                    .push("No node has enough free resources for the requested server".to_string());
            }
        }

        if let Some(best) = ranked.first() {
            let best_is_limited = scope
                .candidates
                .iter()
                .find(|n| n.node_id == best.node_id)
                .map(|n| classify_node(n) == CapacityStatus::Limited)
                .unwrap_or(false);
            if best_is_limited {
                warnings.push(format!(
                    "Best candidate node '{}' is near capacity (limited)",
                    best.node_id
                ));
            }
        }

        if can_accommodate {
            if utilization_after_creation.memory >= CAPACITY_FULL_PERCENT {
                warnings.push(format!(
                    "Memory utilization would reach {}% after creation",
                    utilization_after_creation.memory
                ));
            }
            if utilization_after_creation.disk >= CAPACITY_FULL_PERCENT {
                warnings.push(format!(
                    "Disk utilization would reach {}% after creation",
                    utilization_after_creation.disk
                ));
            }
        }

        let recommended_nodes = if request.include_recommendations {
            Some(
                ranked
                    .into_iter()
                    .take(self.options.max_recommendations)
                    .collect(),
            )
        } else {
            None
        };

        debug!(
            can_accommodate,
            available_nodes,
            location_status = %location_status,
            candidates = scope.candidates.len(),
            "Capacity check evaluated"
        );

        CapacityCheckResult {
            can_accommodate,
            location_status,
            available_nodes,
            total_capacity,
            available_capacity,
            utilization_after_creation,
            recommended_nodes,
            warnings,
        }
    }
}

/// Resolve the request to its candidate nodes, or a warning explaining why not
fn resolve_scope<'a>(
    nodes: &'a [NodeStats],
    request: &CapacityCheckRequest,
) -> Result<Scope<'a>, String> {
    let in_location = |location_id: &str| -> Vec<&'a NodeStats> {
        nodes.iter().filter(|n| n.location_id == location_id).collect()
    };

    match (&request.node_id, &request.location_id) {
        (Some(node_id), location_id) => {
            let node = nodes
                .iter()
                .find(|n| &n.node_id == node_id)
                .ok_or_else(|| format!("Node '{}' not found", node_id))?;

            if let Some(location_id) = location_id {
                if &node.location_id != location_id {
                    return Err(format!(
                        "Node '{}' does not belong to location '{}'",
                        node_id, location_id
                    ));
                }
            }

            Ok(Scope {
                candidates: vec![node],
                location: in_location(node.location_id.as_str()),
            })
        }
        (None, Some(location_id)) => {
            let members = in_location(location_id.as_str());
            if members.is_empty() {
                return Err(format!("No nodes found for location '{}'", location_id));
            }
            Ok(Scope {
                candidates: members.clone(),
                location: members,
            })
        }
        (None, None) => {
            if nodes.is_empty() {
                return Err("No nodes are being monitored".to_string());
            }
            let all: Vec<&NodeStats> = nodes.iter().collect();
            Ok(Scope {
                candidates: all.clone(),
                location: all,
            })
        }
    }
}

fn unresolved(warning: String, include_recommendations: bool) -> CapacityCheckResult {
    CapacityCheckResult {
        can_accommodate: false,
        location_status: CapacityStatus::Full,
        available_nodes: 0,
        total_capacity: CapacityTotals::default(),
        available_capacity: CapacityTotals::default(),
        utilization_after_creation: UtilizationProjection::default(),
        recommended_nodes: include_recommendations.then(Vec::new),
        warnings: vec![warning],
    }
}

/// `(used + required) / total` for memory and disk over the location's nodes
fn project_utilization(nodes: &[&NodeStats], required: &ResourceEnvelope) -> UtilizationProjection {
    let mut total = CapacityTotals::default();
    let mut used = CapacityTotals::default();
    for node in nodes {
        let r = &node.resources;
        total.add(r.memory.total, r.disk.total, r.cpu.total);
        used.add(r.memory.used, r.disk.used, r.cpu.used);
    }

    UtilizationProjection {
        memory: usage_percentage(used.memory + required.memory.max(0.0), total.memory),
        disk: usage_percentage(used.disk + required.disk.max(0.0), total.disk),
    }
}

fn pooled_capacity_suffices(available: &CapacityTotals, required: &ResourceEnvelope) -> bool {
    available.memory >= required.memory
        && available.disk >= required.disk
        && available.cpu >= required.cpu
}
