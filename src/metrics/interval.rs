//! Metrics recorded during one fixed time bucket.

use crate::core::Label;
use crate::metrics::aggregate::AggregateSample;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::watch;

/// Last value set on a gauge
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeValue {
    /// Display name without labels
    pub name: String,
    /// Aggregation key including labels
    pub hash: String,
    /// Last value set
    pub value: f32,
    /// Labels in hash order
    pub labels: Vec<Label>,
}

/// Aggregated counter or sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampledValue {
    /// Display name without labels
    pub name: String,
    /// Aggregation key including labels
    pub hash: String,
    /// Labels in hash order
    pub labels: Vec<Label>,
    /// Running statistics
    pub sample: AggregateSample,
}

impl SampledValue {
    pub(crate) fn new(name: String, hash: String, labels: Vec<Label>) -> Self {
        Self {
            name,
            hash,
            labels,
            sample: AggregateSample::new(),
        }
    }
}

/// The four metric maps of an interval, all keyed by flattened key
#[derive(Debug, Clone, Default)]
pub struct IntervalData {
    /// Gauge key to last set value
    pub gauges: HashMap<String, GaugeValue>,
    /// Emitted key to every value, in emission order
    pub points: HashMap<String, Vec<f32>>,
    /// Counter key to its aggregate
    pub counters: HashMap<String, SampledValue>,
    /// Sample key to its aggregate
    pub samples: HashMap<String, SampledValue>,
}

impl IntervalData {
    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
            && self.points.is_empty()
            && self.counters.is_empty()
            && self.samples.is_empty()
    }
}

/// Aggregated metrics for the bucket starting at [`IntervalMetrics::interval`]
#[derive(Debug)]
pub struct IntervalMetrics {
    interval: SystemTime,
    data: RwLock<IntervalData>,
    done: watch::Sender<bool>,
}

impl IntervalMetrics {
    /// Create an empty interval for the bucket boundary `interval`
    pub fn new(interval: SystemTime) -> Self {
        Self::with_data(interval, IntervalData::default(), false)
    }

    fn with_data(interval: SystemTime, data: IntervalData, done: bool) -> Self {
        Self {
            interval,
            data: RwLock::new(data),
            done: watch::Sender::new(done),
        }
    }

    /// Start of the bucket
    #[inline]
    pub fn interval(&self) -> SystemTime {
        self.interval
    }

    /// Shared access to the metric maps
    pub fn read(&self) -> RwLockReadGuard<'_, IntervalData> {
        self.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, IntervalData> {
        self.data.write()
    }

    /// Independent copy of this interval, taken under its read lock
    pub fn snapshot(&self) -> Self {
        let data = self.data.read().clone();
        Self::with_data(self.interval, data, self.is_done())
    }

    /// True once a newer interval has replaced this one
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    pub(crate) fn mark_done(&self) {
        self.done.send_replace(true);
    }

    /// Resolves when this interval stops being the current one
    pub async fn completed(&self) {
        let mut rx = self.done.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives as long as `self`
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
