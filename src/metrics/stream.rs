//! Streaming one summary per completed interval.

use crate::core::Result;
use crate::metrics::inmem::InmemSink;
use crate::metrics::summary::MetricsSummary;
use std::future::Future;
use std::io::Write;
use tracing::debug;

/// Destination for streamed summaries
pub trait SummaryEncoder: Send {
    /// Encode one summary; an error ends the stream
    fn encode(&mut self, summary: &MetricsSummary) -> Result<()>;
}

/// Writes each summary as one line of JSON
#[derive(Debug)]
pub struct JsonLinesEncoder<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesEncoder<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SummaryEncoder for JsonLinesEncoder<W> {
    fn encode(&mut self, summary: &MetricsSummary) -> Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl InmemSink {
    /// Encode a summary of each interval as it completes, until `shutdown`
    /// resolves or the encoder fails.
    ///
    /// The interval in progress when streaming starts is the first one
    /// reported. An interval completes when a write lands in a later
    /// bucket; the stream then follows the newest interval, so buckets
    /// without writes are neither created nor reported.
    pub async fn stream<E, F>(&self, encoder: &mut E, shutdown: F) -> Result<()>
    where
        E: SummaryEncoder + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut current = self.current_interval();
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    debug!("metrics stream shut down");
                    return Ok(());
                }
                () = current.completed() => {
                    encoder.encode(&MetricsSummary::from_interval(&current))?;
                    current = self.latest_interval().unwrap_or_else(|| self.current_interval());
                }
            }
        }
    }
}
