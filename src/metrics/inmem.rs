//! In-memory aggregation sink.
//!
//! Observations are rolled up into fixed-width wall-clock buckets. The
//! bucket an observation belongs to is `now` truncated to the interval, and
//! a bucket's [`IntervalMetrics`] is created lazily on the first write after
//! its boundary passes, so no background task is needed to roll buckets
//! over. Buckets without writes leave a gap in the history.
//!
//! Locking is two-level: `intervals` guards the sequence of buckets and is
//! only held to find, append or evict one; each bucket has its own lock for
//! its maps. The outer lock is never acquired while an inner one is held.

use crate::core::{Clock, Label, Result, StrataError, SystemClock};
use crate::core::config::InmemConfig;
use crate::metrics::interval::{GaugeValue, IntervalData, IntervalMetrics, SampledValue};
use crate::metrics::key::{flatten_key, flatten_key_labels, FlatKey};
use crate::metrics::summary::MetricsSummary;
use crate::sink::Sink;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Upper bound on the history allocated up front; longer histories grow
/// on demand
const PREALLOCATED_INTERVALS: usize = 64;

/// Aggregates metrics in memory over a bounded sliding history of intervals
pub struct InmemSink {
    interval: Duration,
    retain: Duration,
    max_intervals: usize,
    rate_denom: f64,
    intervals: RwLock<VecDeque<Arc<IntervalMetrics>>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InmemSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InmemSink")
            .field("interval", &self.interval)
            .field("retain", &self.retain)
            .field("max_intervals", &self.max_intervals)
            .field("intervals", &self.intervals.read().len())
            .finish()
    }
}

impl InmemSink {
    /// Create a sink aggregating over `interval` wide buckets and keeping
    /// `retain / interval` of them
    pub fn new(interval: Duration, retain: Duration) -> Result<Self> {
        Self::with_clock(interval, retain, Arc::new(SystemClock))
    }

    /// Create a sink from configuration
    pub fn from_config(config: &InmemConfig) -> Result<Self> {
        Self::new(config.interval, config.retain)
    }

    /// Create a sink reading time from `clock`
    pub fn with_clock(interval: Duration, retain: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let interval_nanos = interval.as_nanos();
        if interval_nanos == 0 || retain < interval {
            return Err(StrataError::InvalidInterval { interval, retain });
        }
        let max_intervals = usize::try_from(retain.as_nanos() / interval_nanos)
            .map_err(|_| StrataError::InvalidInterval { interval, retain })?;

        Ok(Self {
            interval,
            retain,
            max_intervals,
            rate_denom: interval.as_secs_f64(),
            intervals: RwLock::new(VecDeque::with_capacity(
                max_intervals.min(PREALLOCATED_INTERVALS),
            )),
            clock,
        })
    }

    /// Width of one bucket
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total history horizon
    pub fn retain(&self) -> Duration {
        self.retain
    }

    /// Most buckets kept at once
    pub fn max_intervals(&self) -> usize {
        self.max_intervals
    }

    /// Interval length in seconds, the divisor for rates
    pub fn rate_denom(&self) -> f64 {
        self.rate_denom
    }

    /// Number of buckets currently retained
    pub fn interval_count(&self) -> usize {
        self.intervals.read().len()
    }

    /// Copy of the retained intervals, oldest first.
    ///
    /// Forces creation of the current interval. Completed intervals are
    /// shared since nothing writes to them any more; the current one is
    /// deep-copied so later writes do not show up in the returned value.
    pub fn data(&self) -> Vec<Arc<IntervalMetrics>> {
        self.current_interval();

        let intervals = self.intervals.read();
        let last = intervals.len().saturating_sub(1);
        intervals
            .iter()
            .enumerate()
            .map(|(i, intv)| {
                if i == last {
                    Arc::new(intv.snapshot())
                } else {
                    Arc::clone(intv)
                }
            })
            .collect()
    }

    /// Summary of the most recently completed interval.
    ///
    /// With a single interval, that interval is summarized even though it
    /// may still receive writes.
    pub fn display_metrics(&self) -> Result<MetricsSummary> {
        let interval = {
            let intervals = self.intervals.read();
            let n = intervals.len();
            match n {
                0 => return Err(StrataError::NoIntervals),
                1 => Arc::clone(&intervals[0]),
                _ => Arc::clone(&intervals[n - 2]),
            }
        };
        Ok(MetricsSummary::from_interval(&interval))
    }

    /// The interval currently being written, created if its bucket has no
    /// interval yet
    pub(crate) fn current_interval(&self) -> Arc<IntervalMetrics> {
        let boundary = self.truncate(self.clock.now());
        if let Some(existing) = self.existing_interval(boundary) {
            return existing;
        }
        self.create_interval(boundary)
    }

    /// The newest retained interval, without creating one
    pub(crate) fn latest_interval(&self) -> Option<Arc<IntervalMetrics>> {
        self.intervals.read().back().map(Arc::clone)
    }

    fn existing_interval(&self, boundary: SystemTime) -> Option<Arc<IntervalMetrics>> {
        let intervals = self.intervals.read();
        intervals
            .back()
            .filter(|last| last.interval() == boundary)
            .map(Arc::clone)
    }

    fn create_interval(&self, boundary: SystemTime) -> Arc<IntervalMetrics> {
        let mut intervals = self.intervals.write();

        // Another writer may have created it while we waited for the lock
        if let Some(last) = intervals.back() {
            if last.interval() == boundary {
                return Arc::clone(last);
            }
            last.mark_done();
        }

        let current = Arc::new(IntervalMetrics::new(boundary));
        intervals.push_back(Arc::clone(&current));

        while intervals.len() > self.max_intervals {
            if let Some(evicted) = intervals.pop_front() {
                debug!(interval = ?evicted.interval(), "evicted metrics interval");
            }
        }
        debug!(interval = ?boundary, retained = intervals.len(), "started metrics interval");

        current
    }

    fn truncate(&self, now: SystemTime) -> SystemTime {
        let since_epoch = now
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let width = self.interval.as_nanos();
        let floored = since_epoch - since_epoch % width;
        let secs = u64::try_from(floored / 1_000_000_000).unwrap_or(u64::MAX);
        // Remainder of a division by 1e9 always fits
        let nanos = (floored % 1_000_000_000) as u32;
        SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut IntervalData) -> R) -> R {
        let interval = self.current_interval();
        let mut data = interval.write();
        f(&mut data)
    }

    fn ingest(
        &self,
        key: FlatKey,
        value: f32,
        select: impl FnOnce(&mut IntervalData) -> &mut std::collections::HashMap<String, SampledValue>,
    ) {
        let now = self.clock.now();
        let rate_denom = self.rate_denom;
        self.with_current(|data| {
            let FlatKey { name, hash, labels } = key;
            select(data)
                .entry(hash)
                .or_insert_with_key(|hash| SampledValue::new(name, hash.clone(), labels))
                .sample
                .ingest_at(f64::from(value), rate_denom, now);
        });
    }
}

impl Sink for InmemSink {
    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        let FlatKey { name, hash, labels } = flatten_key_labels(key, labels);
        self.with_current(|data| {
            data.gauges.insert(
                hash.clone(),
                GaugeValue {
                    name,
                    hash,
                    value,
                    labels,
                },
            );
        });
    }

    fn emit_key(&self, key: &[&str], value: f32) {
        let name = flatten_key(key);
        self.with_current(|data| data.points.entry(name).or_default().push(value));
    }

    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.ingest(flatten_key_labels(key, labels), value, |data| &mut data.counters);
    }

    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.ingest(flatten_key_labels(key, labels), value, |data| &mut data.samples);
    }
}
