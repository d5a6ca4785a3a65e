//! Common test utilities and fixtures.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use strata_lib::core::{Clock, Label, ManualClock};
use strata_lib::{InmemSink, Sink};

/// One operation seen by a [`MockSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: &'static str,
    pub key: Vec<String>,
    pub value: f32,
    pub labels: Vec<Label>,
}

/// Sink recording every operation it receives
#[derive(Debug, Default)]
pub struct MockSink {
    calls: Mutex<Vec<Call>>,
}

impl MockSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.key.join(".")).collect()
    }

    fn record(&self, kind: &'static str, key: &[&str], value: f32, labels: &[Label]) {
        self.calls.lock().push(Call {
            kind,
            key: key.iter().map(|k| (*k).to_string()).collect(),
            value,
            labels: labels.to_vec(),
        });
    }
}

impl Sink for MockSink {
    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.record("gauge", key, value, labels);
    }

    fn emit_key(&self, key: &[&str], value: f32) {
        self.record("kv", key, value, &[]);
    }

    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.record("counter", key, value, labels);
    }

    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.record("sample", key, value, labels);
    }
}

/// A fixed starting point, 2023-11-14 22:13:20 UTC
pub fn test_epoch() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// In-memory sink driven by a manual clock starting at [`test_epoch`]
pub fn manual_sink(interval: Duration, retain: Duration) -> (Arc<ManualClock>, Arc<InmemSink>) {
    let clock = Arc::new(ManualClock::new(test_epoch()));
    let sink = InmemSink::with_clock(interval, retain, Arc::clone(&clock) as Arc<dyn Clock>)
        .expect("valid sink configuration");
    (clock, Arc::new(sink))
}
