//! Capacity and health aggregation for game-server hosting nodes
//!
//! This crate provides:
//! - Resource metrics and node health scoring
//! - Capacity classification and per-location aggregation
//! - Capacity checks with node recommendations
//! - A telemetry store applying the node lifecycle
//! - Service health checks and observability

pub mod aggregator;
pub mod alerts;
pub mod cache;
pub mod capacity;
pub mod classifier;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod resource;
pub mod scorer;
pub mod store;

pub use capacity::{CapacityChecker, CheckOptions};
pub use classifier::CapacityStatus;
pub use error::CapacityError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{CapacityMetrics, StructuredLogger};
pub use resource::{MetricStatus, ResourceMetric};
pub use store::{RawUsage, TelemetrySample, TelemetryStore};
