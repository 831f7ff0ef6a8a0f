//! Resource metric builder
//!
//! Turns a raw `(total, used)` telemetry pair into a normalized
//! [`ResourceMetric`] with a usage percentage and a status tier.

use serde::{Deserialize, Serialize};

/// Usage percentage at or above which a resource is reported as full
pub const METRIC_FULL_PERCENT: u32 = 95;

/// Usage percentage at or above which a resource is reported as critical
pub const METRIC_CRITICAL_PERCENT: u32 = 85;

/// Usage percentage at or above which a resource is reported as warning
pub const METRIC_WARNING_PERCENT: u32 = 70;

/// Pressure tier of a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Healthy,
    Warning,
    Critical,
    Full,
}

impl MetricStatus {
    /// Map a usage percentage onto its status tier
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= METRIC_FULL_PERCENT {
            MetricStatus::Full
        } else if percentage >= METRIC_CRITICAL_PERCENT {
            MetricStatus::Critical
        } else if percentage >= METRIC_WARNING_PERCENT {
            MetricStatus::Warning
        } else {
            MetricStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricStatus::Healthy => write!(f, "healthy"),
            MetricStatus::Warning => write!(f, "warning"),
            MetricStatus::Critical => write!(f, "critical"),
            MetricStatus::Full => write!(f, "full"),
        }
    }
}

/// Normalized view of one resource on one node
///
/// Rebuilt from every telemetry sample and never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetric {
    pub total: f64,
    pub used: f64,
    pub available: f64,
    pub percentage: u32,
    pub status: MetricStatus,
}

impl ResourceMetric {
    /// Build a metric from capacity and usage.
    ///
    /// Negative inputs are treated as zero. A zero `total` means the capacity
    /// is unknown and yields a percentage of 0.
    pub fn build(total: f64, used: f64) -> Self {
        let total = clamp_non_negative(total);
        let used = clamp_non_negative(used);

        let available = (total - used).max(0.0);
        let percentage = usage_percentage(used, total);

        Self {
            total,
            used,
            available,
            percentage,
            status: MetricStatus::from_percentage(percentage),
        }
    }

    /// Zero-capacity metric used for nodes that have not reported yet
    pub fn empty() -> Self {
        Self::build(0.0, 0.0)
    }

    /// Whether `required` more units fit in the remaining capacity
    pub fn fits(&self, required: f64) -> bool {
        self.available >= clamp_non_negative(required)
    }
}

impl Default for ResourceMetric {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rounded `used / total` percentage, 0 when `total` is not positive
pub fn usage_percentage(used: f64, total: f64) -> u32 {
    if total > 0.0 {
        (clamp_non_negative(used) / total * 100.0).round() as u32
    } else {
        0
    }
}

fn clamp_non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}
