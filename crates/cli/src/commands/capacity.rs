//! Capacity check and monitoring summary commands

use anyhow::Result;
use capacity_lib::{CapacityCheckRequest, CapacityCheckResult};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, MonitoringSummary};
use crate::output::{
    color_capacity_status, color_health, color_percentage, format_cpu, format_mb, format_usage,
    print_json, print_rows, print_success, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Node")]
    node_id: String,
    #[tabled(rename = "Load Score")]
    load_score: u8,
    #[tabled(rename = "Fit Score")]
    fit_score: u8,
}

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "Location")]
    location_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Nodes")]
    nodes: String,
    #[tabled(rename = "Available")]
    available_nodes: u32,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
    #[tabled(rename = "Servers")]
    servers: u32,
    #[tabled(rename = "Health")]
    health: String,
}

/// Ask the service whether a workload of the given size fits
pub async fn check(
    client: &ApiClient,
    request: CapacityCheckRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: CapacityCheckResult = client.post("api/v1/capacity/check", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => render_check(&result),
    }

    Ok(())
}

fn render_check(result: &CapacityCheckResult) {
    if result.can_accommodate {
        print_success("Capacity is available for this server");
    } else {
        println!("{} Capacity is not available for this server", "✗".red().bold());
    }
    println!();

    println!("Location status:  {}", color_capacity_status(result.location_status));
    println!("Available nodes:  {}", result.available_nodes);
    println!(
        "Free memory:      {} of {}",
        format_mb(result.available_capacity.memory),
        format_mb(result.total_capacity.memory)
    );
    println!(
        "Free disk:        {} of {}",
        format_mb(result.available_capacity.disk),
        format_mb(result.total_capacity.disk)
    );
    println!(
        "Free cpu:         {} of {}",
        format_cpu(result.available_capacity.cpu),
        format_cpu(result.total_capacity.cpu)
    );
    println!(
        "After placement:  memory {}, disk {}",
        color_percentage(result.utilization_after_creation.memory),
        color_percentage(result.utilization_after_creation.disk)
    );

    if let Some(recommended) = &result.recommended_nodes {
        println!();
        if recommended.is_empty() {
            print_warning("No node can host this server");
        } else {
            println!("{}", "Recommended nodes".bold());
            let rows = recommended
                .iter()
                .enumerate()
                .map(|(i, r)| RecommendationRow {
                    rank: i + 1,
                    node_id: r.node_id.clone(),
                    load_score: r.load_score,
                    fit_score: r.fit_score,
                })
                .collect();
            print_rows::<RecommendationRow>(rows);
        }
    }

    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            print_warning(warning);
        }
    }
}

/// Show the per-location monitoring summary
pub async fn summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: MonitoringSummary = client.get("api/v1/monitoring/summary").await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            if summary.locations.is_empty() {
                print_warning("No nodes are being monitored");
                return Ok(());
            }

            let rows: Vec<LocationRow> = summary
                .locations
                .iter()
                .map(|l| LocationRow {
                    location_id: l.location_id.clone(),
                    status: color_capacity_status(l.status),
                    nodes: format!("{}/{} online", l.online_nodes, l.total_nodes),
                    available_nodes: l.available_nodes,
                    memory: format_usage(
                        l.used_capacity.memory,
                        l.total_capacity.memory,
                        format_mb,
                    ),
                    disk: format_usage(l.used_capacity.disk, l.total_capacity.disk, format_mb),
                    servers: l.total_servers,
                    health: color_health(l.average_health_score),
                })
                .collect();

            print_rows(rows);
            println!(
                "\n{} nodes across {} locations, generated {}",
                summary.nodes.len(),
                summary.locations.len(),
                summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    Ok(())
}
