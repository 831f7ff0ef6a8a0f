//! Location aggregation
//!
//! Groups node telemetry by location and sums capacity. Every call is a full
//! O(n) pass over the snapshot it is given; nothing is cached or mutated.

use std::collections::HashMap;

use crate::classifier::{classify, classify_node, CapacityStatus};
use crate::models::{CapacityTotals, LocationAggregate, NodeStats, NodeStatus};
use crate::resource::usage_percentage;

/// Summarize nodes into one aggregate per distinct `location_id`.
///
/// Aggregates are returned in order of each location's first appearance.
pub fn aggregate(nodes: &[NodeStats]) -> Vec<LocationAggregate> {
    group_by_location(nodes)
        .into_iter()
        .map(|(location_id, members)| aggregate_location(location_id, &members))
        .collect()
}

/// Group nodes by location, preserving input order within and across groups
pub fn group_by_location(nodes: &[NodeStats]) -> Vec<(&str, Vec<&NodeStats>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&NodeStats>)> = Vec::new();

    for node in nodes {
        let slot = *index.entry(node.location_id.as_str()).or_insert_with(|| {
            groups.push((node.location_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(node);
    }

    groups
}

/// Aggregate a single location. An empty group yields zeroed totals.
pub fn aggregate_location(location_id: &str, nodes: &[&NodeStats]) -> LocationAggregate {
    let mut total_capacity = CapacityTotals::default();
    let mut used_capacity = CapacityTotals::default();
    let mut online_nodes = 0u32;
    let mut available_nodes = 0u32;
    let mut total_servers = 0u32;
    let mut health_sum = 0u64;

    for node in nodes {
        let resources = &node.resources;
        total_capacity.add(resources.memory.total, resources.disk.total, resources.cpu.total);
        used_capacity.add(resources.memory.used, resources.disk.used, resources.cpu.used);

        if node.is_online() {
            online_nodes += 1;
        }
        if is_available(node) {
            available_nodes += 1;
        }
        total_servers += node.servers.total;
        health_sum += node.health.overall_score as u64;
    }

    let average_health_score = if nodes.is_empty() {
        0
    } else {
        (health_sum as f64 / nodes.len() as f64).round() as u8
    };

    LocationAggregate {
        location_id: location_id.to_string(),
        total_nodes: nodes.len() as u32,
        online_nodes,
        available_nodes,
        total_capacity,
        used_capacity,
        total_servers,
        average_health_score,
        status: location_status(nodes, &total_capacity, &used_capacity),
    }
}

/// Capacity status of a set of nodes taken together.
///
/// A location whose every node is in maintenance is in maintenance; an empty
/// location is full. Otherwise the summed usage is classified.
pub fn location_status(
    nodes: &[&NodeStats],
    total: &CapacityTotals,
    used: &CapacityTotals,
) -> CapacityStatus {
    if nodes.is_empty() {
        return CapacityStatus::Full;
    }
    if nodes.iter().all(|n| n.in_maintenance()) {
        return CapacityStatus::Maintenance;
    }

    let max_usage = usage_percentage(used.memory, total.memory)
        .max(usage_percentage(used.disk, total.disk))
        .max(usage_percentage(used.cpu, total.cpu));
    classify(max_usage)
}

/// Nodes ordered by overall health, best first; ties keep input order
pub fn sort_nodes_by_health(nodes: &[NodeStats]) -> Vec<&NodeStats> {
    let mut sorted: Vec<&NodeStats> = nodes.iter().collect();
    // sort_by is stable
    sorted.sort_by(|a, b| b.health.overall_score.cmp(&a.health.overall_score));
    sorted
}

pub fn filter_by_status(nodes: &[NodeStats], status: NodeStatus) -> Vec<&NodeStats> {
    nodes.iter().filter(|n| n.status == status).collect()
}

/// Nodes that are online, out of maintenance and not classified full
pub fn get_available_nodes(nodes: &[NodeStats]) -> Vec<&NodeStats> {
    nodes.iter().filter(|n| is_available(n)).collect()
}

pub(crate) fn is_available(node: &NodeStats) -> bool {
    node.is_online() && !node.in_maintenance() && classify_node(node) != CapacityStatus::Full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceMetric;
    use proptest::prelude::*;

    fn node(id: &str, location: &str, mem_total: f64, mem_used: f64, health: u8) -> NodeStats {
        let mut node = NodeStats::new(id, location, format!("{}.example.com", id));
        node.status = NodeStatus::Online;
        node.resources.memory = ResourceMetric::build(mem_total, mem_used);
        node.resources.disk = ResourceMetric::build(50_000.0, 5_000.0);
        node.resources.cpu = ResourceMetric::build(200.0, 20.0);
        node.servers.total = 3;
        node.health.overall_score = health;
        node
    }

    #[test]
    fn test_aggregate_groups_by_location() {
        let nodes = vec![
            node("a", "eu-west", 8192.0, 2048.0, 90),
            node("b", "us-east", 4096.0, 1024.0, 70),
            node("c", "eu-west", 8192.0, 4096.0, 81),
        ];

        let aggregates = aggregate(&nodes);
        assert_eq!(aggregates.len(), 2);

        let eu = &aggregates[0];
        assert_eq!(eu.location_id, "eu-west");
        assert_eq!(eu.total_nodes, 2);
        assert_eq!(eu.online_nodes, 2);
        assert_eq!(eu.total_capacity.memory, 16_384.0);
        assert_eq!(eu.used_capacity.memory, 6_144.0);
        assert_eq!(eu.total_servers, 6);
        // mean(90, 81) = 85.5 -> 86
        assert_eq!(eu.average_health_score, 86);
        assert_eq!(eu.status, CapacityStatus::Available);

        assert_eq!(aggregates[1].location_id, "us-east");
        assert_eq!(aggregates[1].total_nodes, 1);
    }

    #[test]
    fn test_online_count_excludes_offline() {
        let mut offline = node("b", "eu-west", 8192.0, 0.0, 50);
        offline.status = NodeStatus::Offline;
        let nodes = vec![node("a", "eu-west", 8192.0, 0.0, 100), offline];

        let aggregates = aggregate(&nodes);
        assert_eq!(aggregates[0].online_nodes, 1);
        assert_eq!(aggregates[0].available_nodes, 1);
    }

    #[test]
    fn test_empty_group_is_zeroed() {
        let aggregate = aggregate_location("nowhere", &[]);

        assert_eq!(aggregate.total_nodes, 0);
        assert_eq!(aggregate.average_health_score, 0);
        assert_eq!(aggregate.total_capacity, CapacityTotals::default());
        assert_eq!(aggregate.status, CapacityStatus::Full);
    }

    #[test]
    fn test_empty_input_yields_no_locations() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_all_maintenance_location() {
        let mut a = node("a", "eu-west", 8192.0, 0.0, 100);
        let mut b = node("b", "eu-west", 8192.0, 0.0, 100);
        a.configuration.maintenance_mode = true;
        b.configuration.maintenance_mode = true;

        let aggregates = aggregate(&[a, b]);
        assert_eq!(aggregates[0].status, CapacityStatus::Maintenance);
        assert_eq!(aggregates[0].available_nodes, 0);
    }

    #[test]
    fn test_sort_by_health_is_stable() {
        let nodes = vec![
            node("a", "l", 1.0, 0.0, 70),
            node("b", "l", 1.0, 0.0, 90),
            node("c", "l", 1.0, 0.0, 70),
            node("d", "l", 1.0, 0.0, 90),
        ];

        let ids: Vec<&str> = sort_nodes_by_health(&nodes)
            .iter()
            .map(|n| n.node_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_filter_by_status() {
        let mut offline = node("b", "l", 1.0, 0.0, 0);
        offline.status = NodeStatus::Offline;
        let nodes = vec![node("a", "l", 1.0, 0.0, 0), offline];

        let result = filter_by_status(&nodes, NodeStatus::Offline);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].node_id, "b");
    }

    #[test]
    fn test_available_nodes_excludes_full_maintenance_offline() {
        let full = node("full", "l", 1000.0, 960.0, 50);
        let mut maintenance = node("maint", "l", 1000.0, 100.0, 90);
        maintenance.configuration.maintenance_mode = true;
        let mut offline = node("off", "l", 1000.0, 100.0, 90);
        offline.status = NodeStatus::Offline;
        let ok = node("ok", "l", 1000.0, 300.0, 90);

        let nodes = vec![full, maintenance, offline, ok];
        let available = get_available_nodes(&nodes);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].node_id, "ok");
    }

    fn arb_node() -> impl Strategy<Value = NodeStats> {
        (
            0usize..4,
            0u32..100_000,
            0u32..100_000,
            any::<bool>(),
            any::<bool>(),
            0u8..=100,
        )
            .prop_map(|(loc, total, used, online, maintenance, health)| {
                let mut n = NodeStats::new("n", format!("loc-{}", loc), "n.example.com");
                n.status = if online { NodeStatus::Online } else { NodeStatus::Offline };
                n.configuration.maintenance_mode = maintenance;
                n.resources.memory = ResourceMetric::build(total as f64, used as f64);
                n.health.overall_score = health;
                n
            })
    }

    proptest! {
        #[test]
        fn test_aggregation_is_a_partition(nodes in proptest::collection::vec(arb_node(), 0..40)) {
            let aggregates = aggregate(&nodes);

            let aggregated: f64 = aggregates.iter().map(|a| a.total_capacity.memory).sum();
            let input: f64 = nodes.iter().map(|n| n.resources.memory.total).sum();
            prop_assert_eq!(aggregated, input);

            let counted: u32 = aggregates.iter().map(|a| a.total_nodes).sum();
            prop_assert_eq!(counted as usize, nodes.len());
        }

        #[test]
        fn test_available_nodes_never_offline_or_maintenance(
            nodes in proptest::collection::vec(arb_node(), 0..40)
        ) {
            for n in get_available_nodes(&nodes) {
                prop_assert!(n.is_online());
                prop_assert!(!n.configuration.maintenance_mode);
            }
        }
    }
}
