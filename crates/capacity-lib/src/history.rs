//! Hourly usage history
//!
//! Keeps one bucket per hour of the day (UTC) for cpu, memory, disk and
//! server count. Recording into an hour overwrites whatever that bucket held,
//! so the buckets form a 24-slot ring.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const HISTORY_BUCKETS: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryBucket {
    pub cpu_percent: u32,
    pub memory_percent: u32,
    pub disk_percent: u32,
    pub server_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Which series to read from the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySeries {
    Cpu,
    Memory,
    Disk,
    Servers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHistory {
    pub buckets: Vec<HistoryBucket>,
}

impl Default for NodeHistory {
    fn default() -> Self {
        Self {
            buckets: vec![HistoryBucket::default(); HISTORY_BUCKETS],
        }
    }
}

impl NodeHistory {
    /// Store a sample in the bucket for `now`'s hour
    pub fn record(&mut self, now: DateTime<Utc>, mut bucket: HistoryBucket) {
        if self.buckets.len() != HISTORY_BUCKETS {
            self.buckets.resize(HISTORY_BUCKETS, HistoryBucket::default());
        }
        bucket.recorded_at = Some(now);
        self.buckets[now.hour() as usize] = bucket;
    }

    /// Buckets recorded within the 24 hours before `now`
    fn recent(&self, now: DateTime<Utc>) -> impl Iterator<Item = &HistoryBucket> {
        let cutoff = now - Duration::hours(HISTORY_BUCKETS as i64);
        self.buckets
            .iter()
            .filter(move |b| b.recorded_at.map(|t| t > cutoff).unwrap_or(false))
    }

    pub fn average(&self, series: HistorySeries, now: DateTime<Utc>) -> Option<f64> {
        let values: Vec<u32> = self.recent(now).map(|b| value_of(b, series)).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64)
    }

    pub fn peak(&self, series: HistorySeries, now: DateTime<Utc>) -> Option<u32> {
        self.recent(now).map(|b| value_of(b, series)).max()
    }

    /// Number of buckets holding a recent sample
    pub fn filled(&self, now: DateTime<Utc>) -> usize {
        self.recent(now).count()
    }
}

fn value_of(bucket: &HistoryBucket, series: HistorySeries) -> u32 {
    match series {
        HistorySeries::Cpu => bucket.cpu_percent,
        HistorySeries::Memory => bucket.memory_percent,
        HistorySeries::Disk => bucket.disk_percent,
        HistorySeries::Servers => bucket.server_count,
    }
}
