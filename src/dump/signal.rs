//! Dump completed intervals on demand.

use crate::core::Result;
use crate::metrics::{flatten_labels, InmemSink, IntervalMetrics, SampledValue};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Write every completed interval of `data` to `writer`.
///
/// The last interval is skipped since it may still be aggregating. Entries
/// are ordered by key within each interval.
pub fn write_signal_dump<W: Write + ?Sized>(
    data: &[Arc<IntervalMetrics>],
    writer: &mut W,
) -> io::Result<()> {
    let mut buf = String::new();
    let completed = data.len().saturating_sub(1);

    for intv in &data[..completed] {
        let at = boundary(intv.interval());
        let data = intv.read();

        let mut gauges: Vec<_> = data.gauges.values().collect();
        gauges.sort_by(|a, b| a.hash.cmp(&b.hash));
        for g in gauges {
            let name = flatten_labels(&g.name, &g.labels);
            let _ = writeln!(buf, "[{at}][G] '{name}': {:.3}", g.value);
        }

        let mut points: Vec<_> = data.points.iter().collect();
        points.sort_by(|a, b| a.0.cmp(b.0));
        for (name, values) in points {
            for v in values {
                let _ = writeln!(buf, "[{at}][P] '{name}': {v:.3}");
            }
        }

        write_sampled(&mut buf, &at, 'C', &data.counters);
        write_sampled(&mut buf, &at, 'S', &data.samples);
    }

    writer.write_all(buf.as_bytes())?;
    writer.flush()
}

fn write_sampled(buf: &mut String, at: &str, tag: char, source: &HashMap<String, SampledValue>) {
    let mut entries: Vec<_> = source.values().collect();
    entries.sort_by(|a, b| a.hash.cmp(&b.hash));
    for v in entries {
        let name = flatten_labels(&v.name, &v.labels);
        let _ = writeln!(buf, "[{at}][{tag}] '{name}': {}", v.sample);
    }
}

fn boundary(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(unix)]
type OsTrigger = tokio::signal::unix::Signal;

#[cfg(windows)]
type OsTrigger = tokio::signal::windows::CtrlBreak;

#[cfg(unix)]
fn os_trigger() -> io::Result<OsTrigger> {
    use tokio::signal::unix::{signal, SignalKind};
    signal(SignalKind::user_defined1())
}

#[cfg(windows)]
fn os_trigger() -> io::Result<OsTrigger> {
    tokio::signal::windows::ctrl_break()
}

enum Trigger {
    Os(OsTrigger),
    Manual(mpsc::Receiver<()>),
}

impl Trigger {
    async fn recv(&mut self) -> Option<()> {
        match self {
            Trigger::Os(signal) => signal.recv().await,
            Trigger::Manual(rx) => rx.recv().await,
        }
    }
}

/// Background task writing a dump each time it is triggered
#[derive(Debug)]
pub struct SignalDumper {
    stop: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SignalDumper {
    /// Dump to `writer` whenever the process receives SIGUSR1, or
    /// Ctrl-Break on Windows. Must be called within a tokio runtime.
    pub fn spawn<W>(sink: Arc<InmemSink>, writer: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let trigger = Trigger::Os(os_trigger()?);
        Ok(Self::start(sink, writer, trigger))
    }

    /// Dump to stderr on the default signal
    pub fn spawn_stderr(sink: Arc<InmemSink>) -> Result<Self> {
        Self::spawn(sink, io::stderr())
    }

    /// Dump to `writer` whenever a message arrives on the returned sender
    pub fn manual<W>(sink: Arc<InmemSink>, writer: W) -> (Self, mpsc::Sender<()>)
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        (Self::start(sink, writer, Trigger::Manual(rx)), tx)
    }

    fn start<W>(sink: Arc<InmemSink>, mut writer: W, mut trigger: Trigger) -> Self
    where
        W: Write + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    received = trigger.recv() => {
                        if received.is_none() {
                            break;
                        }
                        let data = sink.data();
                        if let Err(e) = write_signal_dump(&data, &mut writer) {
                            error!(error = %e, "failed to write metrics dump");
                        }
                    }
                }
            }
            debug!("signal dumper stopped");
        });

        Self {
            stop: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop listening. Later calls do nothing.
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
