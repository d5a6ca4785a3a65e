//! Sorted, serializable view of one interval.

use crate::core::Label;
use crate::metrics::interval::{IntervalMetrics, SampledValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

/// Roll-up of one interval, ordered deterministically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Interval boundary, `YYYY-MM-DD HH:MM:SS +0000 UTC`
    pub timestamp: String,
    /// Gauges sorted by hash key
    pub gauges: Vec<GaugeSummary>,
    /// Points sorted by name
    pub points: Vec<PointSummary>,
    /// Counters sorted by hash key
    pub counters: Vec<SampleSummary>,
    /// Samples sorted by hash key
    pub samples: Vec<SampleSummary>,
}

/// A gauge's last value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeSummary {
    /// Display name
    pub name: String,
    /// Aggregation key
    pub hash: String,
    /// Last value set
    pub value: f32,
    /// Labels by name
    pub labels: BTreeMap<String, String>,
}

/// Every value emitted for a key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSummary {
    /// Emitted key
    pub name: String,
    /// Values in emission order
    pub values: Vec<f32>,
}

/// Statistics for a counter or sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    /// Display name
    pub name: String,
    /// Aggregation key
    pub hash: String,
    /// Number of observations
    pub count: u64,
    /// Sum per second of interval
    pub rate: f64,
    /// Sum of observations
    pub sum: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation
    pub stddev: f64,
    /// Labels by name
    pub labels: BTreeMap<String, String>,
}

impl MetricsSummary {
    /// Summarize `interval` under its read lock
    pub fn from_interval(interval: &IntervalMetrics) -> Self {
        let data = interval.read();

        let mut gauges: Vec<GaugeSummary> = data
            .gauges
            .values()
            .map(|g| GaugeSummary {
                name: g.name.clone(),
                hash: g.hash.clone(),
                value: g.value,
                labels: label_map(&g.labels),
            })
            .collect();
        gauges.sort_by(|a, b| a.hash.cmp(&b.hash));

        let mut points: Vec<PointSummary> = data
            .points
            .iter()
            .map(|(name, values)| PointSummary {
                name: name.clone(),
                values: values.clone(),
            })
            .collect();
        points.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            timestamp: format_timestamp(interval.interval()),
            gauges,
            points,
            counters: sampled(&data.counters),
            samples: sampled(&data.samples),
        }
    }
}

fn sampled(source: &HashMap<String, SampledValue>) -> Vec<SampleSummary> {
    let mut out: Vec<SampleSummary> = source
        .values()
        .map(|v| SampleSummary {
            name: v.name.clone(),
            hash: v.hash.clone(),
            count: v.sample.count,
            rate: v.sample.rate,
            sum: v.sample.sum,
            min: v.sample.min,
            max: v.sample.max,
            mean: v.sample.mean(),
            stddev: v.sample.stddev(),
            labels: label_map(&v.labels),
        })
        .collect();
    out.sort_by(|a, b| a.hash.cmp(&b.hash));
    out
}

fn label_map(labels: &[Label]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|l| (l.name.clone(), l.value.clone()))
        .collect()
}

/// Render a boundary rounded to the nearest second, in UTC
pub fn format_timestamp(at: SystemTime) -> String {
    let since_epoch = at
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let mut secs = since_epoch.as_secs();
    if since_epoch.subsec_nanos() >= 500_000_000 {
        secs += 1;
    }
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S +0000 UTC")
        .to_string()
}
