//! Node listing, inspection and maintenance commands

use anyhow::Result;
use capacity_lib::{AlertSeverity, NodeStats};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, MaintenanceRequest};
use crate::output::{
    color_health, color_node_status, color_percentage, format_cpu, format_mb, format_usage,
    print_info, print_json, print_rows, print_success, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node_id: String,
    #[tabled(rename = "Location")]
    location_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Servers")]
    servers: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Alerts")]
    alerts: usize,
}

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: &'static str,
    #[tabled(rename = "Used / Total")]
    usage: String,
    #[tabled(rename = "Usage")]
    percentage: String,
}

impl From<&NodeStats> for NodeRow {
    fn from(node: &NodeStats) -> Self {
        let r = &node.resources;
        Self {
            node_id: node.node_id.clone(),
            location_id: node.location_id.clone(),
            status: color_node_status(node.status),
            memory: color_percentage(r.memory.percentage),
            disk: color_percentage(r.disk.percentage),
            cpu: color_percentage(r.cpu.percentage),
            servers: format!("{}/{}", node.servers.total, node.capacity.max_servers),
            health: color_health(node.health.overall_score),
            alerts: node.alerts.len(),
        }
    }
}

pub async fn list(
    client: &ApiClient,
    location: Option<String>,
    status: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let nodes: Vec<NodeStats> = client
        .get_with_query(
            "api/v1/nodes",
            &[
                ("location_id", location.as_deref()),
                ("status", status.as_deref()),
            ],
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&nodes)?,
        OutputFormat::Table => {
            if nodes.is_empty() {
                print_warning("No nodes found");
                return Ok(());
            }
            let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
            print_rows(rows);
            println!("\nTotal: {} nodes", nodes.len());
        }
    }

    Ok(())
}

pub async fn show(client: &ApiClient, node_id: &str, format: OutputFormat) -> Result<()> {
    let node: NodeStats = client.get(&format!("api/v1/nodes/{}", node_id)).await?;

    match format {
        OutputFormat::Json => print_json(&node)?,
        OutputFormat::Table => render_node(&node),
    }

    Ok(())
}

fn render_node(node: &NodeStats) {
    println!("{}", "Node Details".bold());
    println!("{}", "=".repeat(60));
    println!("Node:      {}", node.node_id.cyan());
    if let Some(name) = &node.name {
        println!("Name:      {}", name);
    }
    println!("Location:  {}", node.location_id.cyan());
    println!("FQDN:      {}", node.fqdn);
    println!("Status:    {}", color_node_status(node.status));
    println!(
        "Health:    {} (cpu {}, memory {}, disk {}, network {}, uptime {})",
        color_health(node.health.overall_score),
        node.health.cpu_score,
        node.health.memory_score,
        node.health.disk_score,
        node.health.network_score,
        node.health.uptime_score
    );
    if let Some(updated) = node.last_updated {
        println!("Updated:   {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    let r = &node.resources;
    let rows = vec![
        ResourceRow {
            resource: "memory",
            usage: format_usage(r.memory.used, r.memory.total, format_mb),
            percentage: color_percentage(r.memory.percentage),
        },
        ResourceRow {
            resource: "disk",
            usage: format_usage(r.disk.used, r.disk.total, format_mb),
            percentage: color_percentage(r.disk.percentage),
        },
        ResourceRow {
            resource: "cpu",
            usage: format_usage(r.cpu.used, r.cpu.total, format_cpu),
            percentage: color_percentage(r.cpu.percentage),
        },
    ];
    print_rows(rows);

    println!(
        "\nServers: {} total, {} running (max {}, recommended {})",
        node.servers.total,
        node.servers.running,
        node.capacity.max_servers,
        node.capacity.recommended_max_servers
    );

    if node.alerts.is_empty() {
        return;
    }
    println!("\n{}", "Alerts".bold());
    for alert in &node.alerts {
        let severity = match alert.severity {
            AlertSeverity::Critical => alert.severity.to_string().red().bold().to_string(),
            AlertSeverity::Warning => alert.severity.to_string().yellow().to_string(),
            AlertSeverity::Info => alert.severity.to_string().blue().to_string(),
        };
        println!("  [{}] {} ({})", severity, alert.message, alert.id.dimmed());
    }
}

/// Enable or disable maintenance mode on a node
pub async fn set_maintenance(
    client: &ApiClient,
    node_id: &str,
    enabled: bool,
    format: OutputFormat,
) -> Result<()> {
    let node: NodeStats = client
        .put(
            &format!("api/v1/nodes/{}/maintenance", node_id),
            &MaintenanceRequest { enabled },
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&node)?,
        OutputFormat::Table => {
            let action = if enabled { "enabled" } else { "disabled" };
            print_success(&format!("Maintenance mode {} on {}", action, node_id));
            print_info(&format!("Node status is now {}", color_node_status(node.status)));
        }
    }

    Ok(())
}

/// Acknowledge and clear one alert on a node
pub async fn acknowledge_alert(
    client: &ApiClient,
    node_id: &str,
    alert_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let node: NodeStats = client
        .delete(&format!("api/v1/nodes/{}/alerts/{}", node_id, alert_id))
        .await?;

    match format {
        OutputFormat::Json => print_json(&node)?,
        OutputFormat::Table => {
            print_success(&format!("Acknowledged alert {}", alert_id));
            if !node.alerts.is_empty() {
                print_info(&format!("{} alerts remain on {}", node.alerts.len(), node_id));
            }
        }
    }

    Ok(())
}
