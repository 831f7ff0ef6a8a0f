//! Error types for the telemetry store and request validation

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapacityError {
    #[error("node '{0}' is not being monitored")]
    UnknownNode(String),

    #[error("invalid telemetry: {0}")]
    InvalidTelemetry(String),

    #[error("alert '{alert_id}' not found on node '{node_id}'")]
    UnknownAlert { node_id: String, alert_id: String },
}

pub type Result<T> = std::result::Result<T, CapacityError>;
