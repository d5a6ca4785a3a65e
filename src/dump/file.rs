//! Periodic file dumps of the interval being aggregated.
//!
//! Every tick the file is overwritten with the last interval returned by
//! [`InmemSink::data`]. Gauges and points are written as `key = value`.
//! Counters and samples are written one line per parameter, as
//! `key.<param> = value`; which parameters are written is chosen per key
//! with a [`SampleFormatter`].

use crate::core::Result;
use crate::metrics::{AggregateSample, InmemSink, IntervalMetrics, SampledValue};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A statistic of an [`AggregateSample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleParam {
    /// Number of observations
    Count,
    /// Sum per second of interval
    Throughput,
    /// Arithmetic mean
    Mean,
    /// Smallest observation
    Min,
    /// Largest observation
    Max,
    /// Sum of observations
    Sum,
    /// Sum of squared observations
    SumSq,
    /// Sample standard deviation
    Stddev,
    /// Time of the last observation
    LastUpdated,
}

impl SampleParam {
    /// Suffix used in the dump
    pub fn name(self) -> &'static str {
        match self {
            SampleParam::Count => "count",
            SampleParam::Throughput => "throughput",
            SampleParam::Mean => "mean",
            SampleParam::Min => "min",
            SampleParam::Max => "max",
            SampleParam::Sum => "sum",
            SampleParam::SumSq => "sumsq",
            SampleParam::Stddev => "stddev",
            SampleParam::LastUpdated => "lastupdt",
        }
    }
}

/// A parameter with an optional number of decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattedParam {
    /// Statistic to write
    pub param: SampleParam,
    /// Decimals for floating point statistics, 3 when unset
    pub precision: Option<usize>,
}

impl From<SampleParam> for FormattedParam {
    fn from(param: SampleParam) -> Self {
        Self {
            param,
            precision: None,
        }
    }
}

impl FormattedParam {
    /// Write `param` with `precision` decimals
    pub fn with_precision(param: SampleParam, precision: usize) -> Self {
        Self {
            param,
            precision: Some(precision),
        }
    }

    /// Render this parameter of `sample`
    pub fn format(&self, sample: &AggregateSample) -> String {
        match self.param {
            SampleParam::Count => sample.count.to_string(),
            SampleParam::LastUpdated => sample
                .last_updated
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_default(),
            SampleParam::Throughput => self.decimal(sample.rate),
            SampleParam::Mean => self.decimal(sample.mean()),
            SampleParam::Min => self.decimal(sample.min),
            SampleParam::Max => self.decimal(sample.max),
            SampleParam::Sum => self.decimal(sample.sum),
            SampleParam::SumSq => self.decimal(sample.sum_sq),
            SampleParam::Stddev => self.decimal(sample.stddev()),
        }
    }

    fn decimal(&self, value: f64) -> String {
        format!("{:.*}", self.precision.unwrap_or(3), value)
    }
}

/// The parameters written for a counter or sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFormatter {
    params: Vec<FormattedParam>,
}

impl Default for SampleFormatter {
    fn default() -> Self {
        Self::new([
            SampleParam::Count,
            SampleParam::Mean,
            SampleParam::Min,
            SampleParam::Max,
        ])
    }
}

impl SampleFormatter {
    /// Write `params`, in order
    pub fn new<P: Into<FormattedParam>>(params: impl IntoIterator<Item = P>) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    fn write(&self, buf: &mut String, key: &str, sample: &AggregateSample) {
        for p in &self.params {
            let _ = writeln!(buf, "{key}.{} = {}", p.param.name(), p.format(sample));
        }
    }
}

/// Render `interval` in the dump file format
pub fn render_file_dump(
    interval: &IntervalMetrics,
    formatters: &DashMap<String, SampleFormatter>,
) -> String {
    let data = interval.read();
    let mut buf = String::new();

    let mut gauges: Vec<_> = data.gauges.iter().collect();
    gauges.sort_by(|a, b| a.0.cmp(b.0));
    for (key, g) in gauges {
        let _ = writeln!(buf, "{key} = {}", g.value);
    }

    let mut points: Vec<_> = data.points.iter().collect();
    points.sort_by(|a, b| a.0.cmp(b.0));
    for (key, values) in points {
        for v in values {
            let _ = writeln!(buf, "{key} = {v}");
        }
    }

    write_sampled(&mut buf, &data.counters, formatters);
    write_sampled(&mut buf, &data.samples, formatters);
    buf
}

fn write_sampled(
    buf: &mut String,
    source: &HashMap<String, SampledValue>,
    formatters: &DashMap<String, SampleFormatter>,
) {
    let mut keys: Vec<&String> = source.keys().collect();
    keys.sort();
    let default = SampleFormatter::default();
    for key in keys {
        let sample = &source[key].sample;
        match formatters.get(key) {
            Some(formatter) => formatter.write(buf, key, sample),
            None => default.write(buf, key, sample),
        }
    }
}

/// Background task rewriting a file with the current interval
#[derive(Debug)]
pub struct FileDumper {
    path: PathBuf,
    sink: Arc<InmemSink>,
    formatters: Arc<DashMap<String, SampleFormatter>>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FileDumper {
    /// Rewrite `path` every `every`. Must be called within a tokio runtime.
    pub fn spawn(sink: Arc<InmemSink>, every: Duration, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let formatters = Arc::new(DashMap::new());
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = {
            let sink = Arc::clone(&sink);
            let formatters = Arc::clone(&formatters);
            let path = path.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = ticker.tick() => {
                            if let Err(e) = dump_to(&sink, &formatters, &path) {
                                error!(path = %path.display(), error = %e, "cannot dump metrics to file");
                            }
                        }
                    }
                }
                debug!(path = %path.display(), "file dumper stopped");
            })
        };

        Self {
            path,
            sink,
            formatters,
            stop: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Choose which parameters are written for `key`
    pub fn set_formatter<P: Into<FormattedParam>>(
        &self,
        key: impl Into<String>,
        params: impl IntoIterator<Item = P>,
    ) {
        self.formatters.insert(key.into(), SampleFormatter::new(params));
    }

    /// Write the file immediately
    pub fn dump_now(&self) -> Result<()> {
        dump_to(&self.sink, &self.formatters, &self.path)
    }

    /// Stop the periodic dump. Later calls do nothing.
    pub fn stop(&self) {
        if let Some(tx) = self.stop.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Stop and wait for the background task to finish
    pub async fn shutdown(&self) -> Result<()> {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }
}

fn dump_to(
    sink: &InmemSink,
    formatters: &DashMap<String, SampleFormatter>,
    path: &Path,
) -> Result<()> {
    let data = sink.data();
    let contents = data
        .last()
        .map(|intv| render_file_dump(intv, formatters))
        .unwrap_or_default();
    std::fs::write(path, contents)?;
    Ok(())
}
