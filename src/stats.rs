//! Per-operation latency statistics.
//!
//! Samples are only ever appended. Readers get a snapshot copy, so holding
//! one does not block dispatches that are recording.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One recorded latency
#[derive(Debug, Clone, Serialize)]
pub struct LatencySample {
    /// Elapsed wall time in seconds
    pub duration_secs: f64,
    /// Optional second metric (unused by the dispatcher)
    pub secondary: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate view over the samples of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
    pub p50_secs: f64,
    pub p90_secs: f64,
    pub p99_secs: f64,
}

impl LatencySummary {
    fn from_samples(samples: &[LatencySample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut durations: Vec<f64> = samples.iter().map(|s| s.duration_secs).collect();
        durations.sort_by(|a, b| a.total_cmp(b));

        let count = durations.len();
        let sum: f64 = durations.iter().sum();

        Some(Self {
            count,
            mean_secs: sum / count as f64,
            min_secs: durations[0],
            max_secs: durations[count - 1],
            p50_secs: percentile(&durations, 50.0),
            p90_secs: percentile(&durations, 90.0),
            p99_secs: percentile(&durations, 99.0),
        })
    }
}

/// Nearest-rank percentile over sorted, non-empty input
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (pct * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Process-wide latency store, keyed by operation name
#[derive(Default)]
pub struct StatisticsSink {
    samples: Arc<Mutex<HashMap<String, Vec<LatencySample>>>>,
}

impl StatisticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a latency sample for `operation`.
    ///
    /// Negative or non-finite durations are stored as zero.
    pub async fn record_latency(&self, operation: &str, duration_secs: f64, secondary: Option<f64>) {
        let duration_secs = if duration_secs.is_finite() && duration_secs > 0.0 {
            duration_secs
        } else {
            0.0
        };

        let sample = LatencySample {
            duration_secs,
            secondary,
            recorded_at: Utc::now(),
        };

        let mut samples = self.samples.lock().await;
        samples
            .entry(operation.to_string())
            .or_default()
            .push(sample);
    }

    /// All samples recorded for `operation`, oldest first
    pub async fn samples(&self, operation: &str) -> Vec<LatencySample> {
        let samples = self.samples.lock().await;
        samples.get(operation).cloned().unwrap_or_default()
    }

    /// Number of samples recorded for `operation`
    pub async fn count(&self, operation: &str) -> usize {
        let samples = self.samples.lock().await;
        samples.get(operation).map_or(0, Vec::len)
    }

    /// Names of every operation with at least one sample
    pub async fn operations(&self) -> Vec<String> {
        let samples = self.samples.lock().await;
        let mut names: Vec<String> = samples.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn summary(&self, operation: &str) -> Option<LatencySummary> {
        let samples = self.samples.lock().await;
        samples
            .get(operation)
            .and_then(|s| LatencySummary::from_samples(s))
    }

    /// Summary of every operation, keyed by name
    pub async fn snapshot(&self) -> HashMap<String, LatencySummary> {
        let samples = self.samples.lock().await;
        samples
            .iter()
            .filter_map(|(name, s)| LatencySummary::from_samples(s).map(|sum| (name.clone(), sum)))
            .collect()
    }
}
