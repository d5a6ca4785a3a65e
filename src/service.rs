//! Metric emitter facade.
//!
//! [`MetricService`] shapes keys before handing them to a [`Sink`]: an
//! optional host name and service name are prepended, and the metric type
//! can be appended as a suffix. It also measures elapsed time and can
//! periodically publish runtime statistics of the host.

use crate::core::{Label, MetricServiceConfig};
use crate::sink::Sink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Kind of metric, used as the optional key suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Last-value gauge
    Gauge,
    /// Raw key/value point
    KeyValue,
    /// Accumulating counter
    Counter,
    /// Sampled observation
    Sample,
    /// Elapsed-time sample
    Timer,
}

impl MetricKind {
    /// Suffix appended to keys of this kind
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::KeyValue => "kv",
            MetricKind::Counter => "counter",
            MetricKind::Sample => "sample",
            MetricKind::Timer => "timer",
        }
    }
}

/// Emits metrics to a sink following a [`MetricServiceConfig`]
pub struct MetricService {
    config: MetricServiceConfig,
    host_name: Option<String>,
    sink: Arc<dyn Sink>,
}

impl std::fmt::Debug for MetricService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricService")
            .field("config", &self.config)
            .field("host_name", &self.host_name)
            .finish_non_exhaustive()
    }
}

impl MetricService {
    /// Create a service writing to `sink`.
    ///
    /// When host name prefixing is enabled and no host name is configured,
    /// it is read from the operating system.
    pub fn new(config: MetricServiceConfig, sink: Arc<dyn Sink>) -> Self {
        let host_name = if config.enable_host_name {
            config.host_name.clone().or_else(System::host_name)
        } else {
            config.host_name.clone()
        };
        Self {
            config,
            host_name,
            sink,
        }
    }

    /// The configuration in effect
    pub fn config(&self) -> &MetricServiceConfig {
        &self.config
    }

    /// Host name used as prefix, if any was configured or resolved
    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    /// The underlying sink
    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Set a gauge
    pub fn set_gauge(&self, key: &[&str], value: f32) {
        self.set_gauge_with_labels(key, value, &[]);
    }

    /// Set a labelled gauge
    pub fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        let key = self.key(key, MetricKind::Gauge);
        self.sink.set_gauge_with_labels(&key, value, labels);
    }

    /// Emit a key/value point
    pub fn emit_key(&self, key: &[&str], value: f32) {
        let key = self.key(key, MetricKind::KeyValue);
        self.sink.emit_key(&key, value);
    }

    /// Increment a counter
    pub fn incr_counter(&self, key: &[&str], value: f32) {
        self.incr_counter_with_labels(key, value, &[]);
    }

    /// Increment a labelled counter
    pub fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        let key = self.key(key, MetricKind::Counter);
        self.sink.incr_counter_with_labels(&key, value, labels);
    }

    /// Add a sample
    pub fn add_sample(&self, key: &[&str], value: f32) {
        self.add_sample_with_labels(key, value, &[]);
    }

    /// Add a labelled sample
    pub fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        let key = self.key(key, MetricKind::Sample);
        self.sink.add_sample_with_labels(&key, value, labels);
    }

    /// Record the time elapsed since `start`, in units of the timer
    /// granularity
    pub fn measure_since(&self, key: &[&str], start: Instant) {
        self.measure_since_with_labels(key, start, &[]);
    }

    /// Record the labelled time elapsed since `start`
    pub fn measure_since_with_labels(&self, key: &[&str], start: Instant, labels: &[Label]) {
        self.measure_elapsed_with_labels(key, start.elapsed(), labels);
    }

    /// Record an already measured duration as a timer sample
    pub fn measure_elapsed_with_labels(&self, key: &[&str], elapsed: Duration, labels: &[Label]) {
        let key = self.key(key, MetricKind::Timer);
        let granularity = self.config.timer_granularity.as_nanos().max(1) as f64;
        let value = (elapsed.as_nanos() as f64 / granularity) as f32;
        self.sink.add_sample_with_labels(&key, value, labels);
    }

    fn key<'a>(&'a self, key: &[&'a str], kind: MetricKind) -> Vec<&'a str> {
        let mut out = Vec::with_capacity(key.len() + 3);
        if self.config.enable_service_name && !self.config.service_name.is_empty() {
            out.push(self.config.service_name.as_str());
        }
        if self.config.enable_host_name {
            if let Some(host) = self.host_name.as_deref().filter(|h| !h.is_empty()) {
                out.push(host);
            }
        }
        out.extend_from_slice(key);
        if self.config.enable_type_suffix {
            out.push(kind.as_str());
        }
        out
    }

    /// Spawn the runtime statistics collector on the current tokio runtime.
    ///
    /// Returns `None` when runtime metrics are disabled or no runtime is
    /// running.
    pub fn start_runtime_metrics(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enable_runtime_metrics {
            return None;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("runtime metrics enabled but no tokio runtime is running");
            return None;
        };

        let service = Arc::clone(self);
        let period = self.config.profile_interval;
        debug!(?period, "starting runtime metrics collector");

        Some(handle.spawn(async move {
            let mut system = System::new();
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.emit_runtime_stats(&mut system);
            }
        }))
    }

    /// Publish one round of host statistics as `runtime.*` gauges
    pub fn emit_runtime_stats(&self, system: &mut System) {
        system.refresh_memory();
        system.refresh_cpu_all();

        self.set_gauge(&["runtime", "total_memory_bytes"], system.total_memory() as f32);
        self.set_gauge(&["runtime", "used_memory_bytes"], system.used_memory() as f32);
        self.set_gauge(
            &["runtime", "available_memory_bytes"],
            system.available_memory() as f32,
        );

        let cpus = system.cpus();
        self.set_gauge(&["runtime", "cpu_count"], cpus.len() as f32);
        if !cpus.is_empty() {
            let usage = cpus.iter().map(sysinfo::Cpu::cpu_usage).sum::<f32>() / cpus.len() as f32;
            self.set_gauge(&["runtime", "cpu_usage_percent"], usage);
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let metrics = handle.metrics();
            self.set_gauge(&["runtime", "num_tasks"], metrics.num_alive_tasks() as f32);
            self.set_gauge(&["runtime", "num_workers"], metrics.num_workers() as f32);
        }
    }
}
