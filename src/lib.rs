//! Strata - application instrumentation with an in-memory aggregator.
//!
//! Strata provides a uniform API for emitting gauges, counters, timers and
//! sampled values, fanned out to pluggable sinks. Its core is an in-memory
//! sink that rolls raw observations up into fixed-width time intervals and
//! keeps a bounded history of them for inspection.
//!
//! # Features
//!
//! - **Interval Aggregation**: count, sum, min, max, mean, stddev and rate
//!   per key and interval, without keeping raw values
//! - **Labels**: labelled series aggregate separately under a stable key
//! - **Pluggable Sinks**: fan out to several sinks, isolating failures
//! - **Display Endpoint**: JSON summary of the last completed interval
//! - **Dumps**: signal-triggered and periodic file dumps
//!
//! # Architecture
//!
//! - `metrics`: the in-memory sink, intervals and summaries
//! - `sink`: the sink contract and composite sinks
//! - `service`: key prefixing, timers and runtime metrics
//! - `global`: process-wide default service
//! - `endpoint`: sinks built from URLs
//! - `dump`: signal and file dumpers
//! - `api`: HTTP display endpoint
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use strata_lib::core::MetricServiceConfig;
//! use strata_lib::{InmemSink, MetricService, Sink};
//!
//! let sink = Arc::new(InmemSink::new(Duration::from_secs(10), Duration::from_secs(60))?);
//! let metrics = MetricService::new(
//!     MetricServiceConfig::with_service_name("checkout"),
//!     Arc::clone(&sink) as Arc<dyn Sink>,
//! );
//! metrics.incr_counter(&["orders", "placed"], 1.0);
//!
//! let summary = sink.display_metrics()?;
//! println!("{}", serde_json::to_string_pretty(&summary)?);
//! # Ok::<(), strata_lib::core::StrataError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod api;
pub mod cli;
pub mod core;
pub mod dump;
pub mod endpoint;
pub mod global;
pub mod metrics;
pub mod service;
pub mod sink;

// Re-export core types for convenience
pub use crate::core::{Config, Label, Result, StrataError};
pub use crate::metrics::{InmemSink, MetricsSummary};
pub use crate::service::MetricService;
pub use crate::sink::{BlackholeSink, FanoutSink, Sink};
