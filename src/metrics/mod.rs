//! In-memory, time-windowed metrics aggregation.
//!
//! Observations are assigned to fixed-width wall-clock buckets and rolled
//! up per key into running statistics. A bounded history of buckets is
//! kept and can be read back as raw [`IntervalMetrics`] or as a sorted
//! [`MetricsSummary`].

pub mod aggregate;
pub mod inmem;
pub mod interval;
pub mod key;
pub mod stream;
pub mod summary;

pub use aggregate::AggregateSample;
pub use inmem::InmemSink;
pub use interval::{GaugeValue, IntervalData, IntervalMetrics, SampledValue};
pub use key::{flatten_key, flatten_key_labels, flatten_labels, FlatKey};
pub use stream::{JsonLinesEncoder, SummaryEncoder};
pub use summary::{GaugeSummary, MetricsSummary, PointSummary, SampleSummary};
