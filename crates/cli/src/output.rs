//! Output formatting utilities

use capacity_lib::{CapacityStatus, MetricStatus, NodeStatus};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a rounded table
pub fn print_rows<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a megabyte amount, switching to GiB from 1024 MB
pub fn format_mb(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.1}Gi", mb / 1024.0)
    } else {
        format!("{:.0}Mi", mb)
    }
}

pub fn format_cpu(percent: f64) -> String {
    format!("{:.0}%", percent)
}

/// `used / total` pair for table cells
pub fn format_usage(used: f64, total: f64, fmt: fn(f64) -> String) -> String {
    format!("{} / {}", fmt(used), fmt(total))
}

/// Color a usage percentage by its resource status tier
pub fn color_percentage(percentage: u32) -> String {
    let formatted = format!("{}%", percentage);
    match MetricStatus::from_percentage(percentage) {
        MetricStatus::Healthy => formatted.green().to_string(),
        MetricStatus::Warning => formatted.yellow().to_string(),
        MetricStatus::Critical => formatted.truecolor(255, 140, 0).to_string(),
        MetricStatus::Full => formatted.red().bold().to_string(),
    }
}

pub fn color_capacity_status(status: CapacityStatus) -> String {
    let text = status.as_str();
    match status {
        CapacityStatus::Available => text.green().to_string(),
        CapacityStatus::Limited => text.yellow().to_string(),
        CapacityStatus::Full => text.red().to_string(),
        CapacityStatus::Maintenance => text.blue().to_string(),
    }
}

pub fn color_node_status(status: NodeStatus) -> String {
    let text = status.as_str();
    match status {
        NodeStatus::Online => text.green().to_string(),
        NodeStatus::Maintenance => text.blue().to_string(),
        NodeStatus::Overloaded => text.yellow().to_string(),
        NodeStatus::Offline | NodeStatus::Error => text.red().to_string(),
    }
}

/// Color a 0..=100 health score
pub fn color_health(score: u8) -> String {
    let formatted = score.to_string();
    if score >= 80 {
        formatted.green().to_string()
    } else if score >= 50 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(512.0), "512Mi");
        assert_eq!(format_mb(2048.0), "2.0Gi");
        assert_eq!(format_mb(16384.0), "16.0Gi");
    }

    #[test]
    fn test_format_usage() {
        assert_eq!(format_usage(4096.0, 16384.0, format_mb), "4.0Gi / 16.0Gi");
        assert_eq!(format_usage(20.0, 100.0, format_cpu), "20% / 100%");
    }

    #[test]
    fn test_colored_values_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_percentage(96), "96%");
        assert_eq!(color_capacity_status(CapacityStatus::Limited), "limited");
        assert_eq!(color_node_status(NodeStatus::Offline), "offline");
        assert_eq!(color_health(42), "42");
    }
}
