//! Capacity service: HTTP API over the telemetry store plus the stale sweeper

pub mod api;
pub mod config;
pub mod sweeper;
