//! CythroDash capacity CLI
//!
//! A command-line tool for checking node capacity, viewing the monitoring
//! summary and managing node maintenance on the CythroDash capacity service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use capacity_lib::CapacityCheckRequest;
use clap::{ArgGroup, Parser, Subcommand};
use commands::{capacity, nodes};

/// CythroDash capacity CLI
#[derive(Parser)]
#[command(name = "cythro")]
#[command(author, version, about = "CLI for the CythroDash capacity service", long_about = None)]
pub struct Cli {
    /// Capacity service URL (can also be set via CYTHRO_API_URL env var)
    #[arg(long, env = "CYTHRO_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a new server fits in a location or on a node
    Check {
        /// Location to check (defaults to the configured location)
        #[arg(long, short)]
        location: Option<String>,

        /// Specific node to check
        #[arg(long, short)]
        node: Option<String>,

        /// Required memory in MB
        #[arg(long)]
        memory: Option<f64>,

        /// Required disk in MB
        #[arg(long)]
        disk: Option<f64>,

        /// Required cpu in percent
        #[arg(long)]
        cpu: Option<f64>,

        /// Include ranked node recommendations
        #[arg(long)]
        recommend: bool,
    },

    /// Show capacity per location
    Summary,

    /// List monitored nodes
    Nodes {
        /// Filter by location
        #[arg(long, short)]
        location: Option<String>,

        /// Filter by status (online, offline, maintenance, overloaded, error)
        #[arg(long, short)]
        status: Option<String>,
    },

    /// Show one node in detail
    Node {
        /// Node ID
        id: String,
    },

    /// Enable or disable maintenance mode on a node
    #[command(group(ArgGroup::new("mode").required(true).args(["enable", "disable"])))]
    Maintenance {
        /// Node ID
        id: String,

        /// Put the node into maintenance
        #[arg(long)]
        enable: bool,

        /// Return the node to service
        #[arg(long)]
        disable: bool,
    },

    /// Acknowledge an alert on a node
    Ack {
        /// Node ID
        node: String,

        /// Alert ID (as shown by `cythro node`)
        alert: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());

    let client = client::ApiClient::new(&api_url)?;
    if cli.verbose {
        output::print_info(&format!("Using capacity service at {}", client.base_url()));
    }

    match cli.command {
        Commands::Check {
            location,
            node,
            memory,
            disk,
            cpu,
            recommend,
        } => {
            let location_id = if node.is_some() {
                location
            } else {
                config.resolve_location(location)
            };
            let request = CapacityCheckRequest {
                location_id,
                node_id: node,
                required_memory: memory,
                required_disk: disk,
                required_cpu: cpu,
                include_recommendations: recommend,
            };
            capacity::check(&client, request, cli.format).await?;
        }
        Commands::Summary => {
            capacity::summary(&client, cli.format).await?;
        }
        Commands::Nodes { location, status } => {
            let location = config.resolve_location(location);
            nodes::list(&client, location, status, cli.format).await?;
        }
        Commands::Node { id } => {
            nodes::show(&client, &id, cli.format).await?;
        }
        Commands::Maintenance { id, enable, .. } => {
            nodes::set_maintenance(&client, &id, enable, cli.format).await?;
        }
        Commands::Ack { node, alert } => {
            nodes::acknowledge_alert(&client, &node, &alert, cli.format).await?;
        }
    }

    Ok(())
}
