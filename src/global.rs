//! Process-wide default metric service.
//!
//! A service can be installed once. The free functions forward to it and
//! silently do nothing while none is installed, so library code can
//! instrument itself unconditionally.

use crate::core::{Label, MetricServiceConfig, Result, StrataError};
use crate::service::MetricService;
use crate::sink::Sink;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

static GLOBAL_SERVICE: OnceLock<Arc<MetricService>> = OnceLock::new();

/// Install `service` as the global default.
///
/// Fails with [`StrataError::GlobalAlreadyInstalled`] if one was already
/// installed; the existing service stays in place.
pub fn install_global(service: MetricService) -> Result<Arc<MetricService>> {
    let service = Arc::new(service);
    GLOBAL_SERVICE
        .set(Arc::clone(&service))
        .map_err(|_| StrataError::GlobalAlreadyInstalled)?;
    Ok(service)
}

/// Build a service over `sink` and install it as the global default
pub fn init_global(config: MetricServiceConfig, sink: Arc<dyn Sink>) -> Result<Arc<MetricService>> {
    install_global(MetricService::new(config, sink))
}

/// The installed global service, if any
pub fn global() -> Option<&'static Arc<MetricService>> {
    GLOBAL_SERVICE.get()
}

#[inline]
fn with_global(f: impl FnOnce(&MetricService)) {
    if let Some(service) = GLOBAL_SERVICE.get() {
        f(service);
    }
}

/// Set a gauge on the global service
pub fn set_gauge(key: &[&str], value: f32) {
    with_global(|m| m.set_gauge(key, value));
}

/// Set a labelled gauge on the global service
pub fn set_gauge_with_labels(key: &[&str], value: f32, labels: &[Label]) {
    with_global(|m| m.set_gauge_with_labels(key, value, labels));
}

/// Emit a key/value point on the global service
pub fn emit_key(key: &[&str], value: f32) {
    with_global(|m| m.emit_key(key, value));
}

/// Increment a counter on the global service
pub fn incr_counter(key: &[&str], value: f32) {
    with_global(|m| m.incr_counter(key, value));
}

/// Increment a labelled counter on the global service
pub fn incr_counter_with_labels(key: &[&str], value: f32, labels: &[Label]) {
    with_global(|m| m.incr_counter_with_labels(key, value, labels));
}

/// Add a sample on the global service
pub fn add_sample(key: &[&str], value: f32) {
    with_global(|m| m.add_sample(key, value));
}

/// Add a labelled sample on the global service
pub fn add_sample_with_labels(key: &[&str], value: f32, labels: &[Label]) {
    with_global(|m| m.add_sample_with_labels(key, value, labels));
}

/// Record the time elapsed since `start` on the global service
pub fn measure_since(key: &[&str], start: Instant) {
    with_global(|m| m.measure_since(key, start));
}

/// Record the labelled time elapsed since `start` on the global service
pub fn measure_since_with_labels(key: &[&str], start: Instant, labels: &[Label]) {
    with_global(|m| m.measure_since_with_labels(key, start, labels));
}
