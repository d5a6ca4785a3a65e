//! The sink contract and the composite sinks built on it.
//!
//! A [`Sink`] receives the raw metric operations. Implementations must
//! never block the caller on downstream I/O and never surface errors from
//! an ingestion call.

use crate::core::Label;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Receives metric operations
pub trait Sink: Send + Sync {
    /// Set a gauge to its latest value
    fn set_gauge(&self, key: &[&str], value: f32) {
        self.set_gauge_with_labels(key, value, &[]);
    }

    /// Set a labelled gauge to its latest value
    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);

    /// Record one key/value pair, kept as-is
    fn emit_key(&self, key: &[&str], value: f32);

    /// Accumulate a counter increment
    fn incr_counter(&self, key: &[&str], value: f32) {
        self.incr_counter_with_labels(key, value, &[]);
    }

    /// Accumulate a labelled counter increment
    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);

    /// Record a timing or size observation
    fn add_sample(&self, key: &[&str], value: f32) {
        self.add_sample_with_labels(key, value, &[]);
    }

    /// Record a labelled timing or size observation
    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn set_gauge(&self, key: &[&str], value: f32) {
        (**self).set_gauge(key, value);
    }

    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        (**self).set_gauge_with_labels(key, value, labels);
    }

    fn emit_key(&self, key: &[&str], value: f32) {
        (**self).emit_key(key, value);
    }

    fn incr_counter(&self, key: &[&str], value: f32) {
        (**self).incr_counter(key, value);
    }

    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        (**self).incr_counter_with_labels(key, value, labels);
    }

    fn add_sample(&self, key: &[&str], value: f32) {
        (**self).add_sample(key, value);
    }

    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        (**self).add_sample_with_labels(key, value, labels);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl Sink for BlackholeSink {
    fn set_gauge_with_labels(&self, _key: &[&str], _value: f32, _labels: &[Label]) {}

    fn emit_key(&self, _key: &[&str], _value: f32) {}

    fn incr_counter_with_labels(&self, _key: &[&str], _value: f32, _labels: &[Label]) {}

    fn add_sample_with_labels(&self, _key: &[&str], _value: f32, _labels: &[Label]) {}
}

/// Forwards every operation to each of its sinks.
///
/// A sink that panics is logged and skipped for that call; the remaining
/// sinks still receive it.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutSink {
    /// Fan out to `sinks`, in order
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Add another destination
    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Number of destinations
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True with no destinations
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn each(&self, op: &'static str, f: impl Fn(&dyn Sink)) {
        for (index, sink) in self.sinks.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))).is_err() {
                warn!(sink = index, op, "metric sink panicked, skipping");
            }
        }
    }
}

impl Sink for FanoutSink {
    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.each("set_gauge", |s| s.set_gauge_with_labels(key, value, labels));
    }

    fn emit_key(&self, key: &[&str], value: f32) {
        self.each("emit_key", |s| s.emit_key(key, value));
    }

    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.each("incr_counter", |s| s.incr_counter_with_labels(key, value, labels));
    }

    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.each("add_sample", |s| s.add_sample_with_labels(key, value, labels));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Sink for Recorder {
        fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
            self.calls
                .lock()
                .push(format!("gauge {} {} {}", key.join("."), value, labels.len()));
        }

        fn emit_key(&self, key: &[&str], value: f32) {
            self.calls.lock().push(format!("kv {} {}", key.join("."), value));
        }

        fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
            self.calls
                .lock()
                .push(format!("counter {} {} {}", key.join("."), value, labels.len()));
        }

        fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
            self.calls
                .lock()
                .push(format!("sample {} {} {}", key.join("."), value, labels.len()));
        }
    }

    struct Exploding;

    impl Sink for Exploding {
        fn set_gauge_with_labels(&self, _: &[&str], _: f32, _: &[Label]) {
            panic!("gauge backend down");
        }
        fn emit_key(&self, _: &[&str], _: f32) {
            panic!("kv backend down");
        }
        fn incr_counter_with_labels(&self, _: &[&str], _: f32, _: &[Label]) {
            panic!("counter backend down");
        }
        fn add_sample_with_labels(&self, _: &[&str], _: f32, _: &[Label]) {
            panic!("sample backend down");
        }
    }

    #[test]
    fn test_unlabelled_defaults_forward_empty_labels() {
        let rec = Recorder::default();
        rec.set_gauge(&["a", "b"], 1.0);
        rec.incr_counter(&["c"], 2.0);
        rec.add_sample(&["s"], 3.0);
        assert_eq!(
            *rec.calls.lock(),
            vec!["gauge a.b 1 0", "counter c 2 0", "sample s 3 0"]
        );
    }

    #[test]
    fn test_blackhole_accepts_everything() {
        let sink = BlackholeSink;
        sink.set_gauge(&["a"], 1.0);
        sink.emit_key(&["a"], 1.0);
        sink.incr_counter_with_labels(&["a"], 1.0, &[Label::new("k", "v")]);
        sink.add_sample(&["a"], f32::NAN);
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let fanout = FanoutSink::new(vec![
            Arc::clone(&first) as Arc<dyn Sink>,
            Arc::clone(&second) as Arc<dyn Sink>,
        ]);
        assert_eq!(fanout.len(), 2);

        fanout.emit_key(&["k"], 4.0);
        fanout.incr_counter_with_labels(&["c"], 1.0, &[Label::new("a", "b")]);

        for rec in [&first, &second] {
            assert_eq!(*rec.calls.lock(), vec!["kv k 4", "counter c 1 1"]);
        }
    }

    #[test]
    fn test_fanout_isolates_panicking_sink() {
        let healthy = Arc::new(Recorder::default());
        let mut fanout = FanoutSink::default();
        assert!(fanout.is_empty());
        fanout.push(Arc::new(Exploding));
        fanout.push(Arc::clone(&healthy) as Arc<dyn Sink>);

        fanout.set_gauge(&["g"], 1.0);
        fanout.emit_key(&["k"], 2.0);
        fanout.incr_counter(&["c"], 3.0);
        fanout.add_sample(&["s"], 4.0);

        assert_eq!(healthy.calls.lock().len(), 4);
    }

    #[test]
    fn test_arc_forwards() {
        let rec = Arc::new(Recorder::default());
        let shared: Arc<Recorder> = Arc::clone(&rec);
        Sink::emit_key(&shared, &["x"], 1.0);
        assert_eq!(rec.calls.lock().len(), 1);
    }
}
