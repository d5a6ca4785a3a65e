//! Sink construction from URLs.
//!
//! The URL scheme picks the sink type and query parameters set its
//! options:
//!
//! - `inmem://?interval=10s&retain=1m` builds an [`InmemSink`]. Both
//!   parameters are required and use `humantime` duration syntax.
//! - `blackhole://` builds a [`BlackholeSink`].

use crate::core::{Result, StrataError};
use crate::metrics::InmemSink;
use crate::sink::{BlackholeSink, Sink};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Build a sink from a URL string
pub fn sink_from_url(raw: &str) -> Result<Arc<dyn Sink>> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "inmem" => Ok(Arc::new(inmem_sink_from_url(&url)?)),
        "blackhole" => Ok(Arc::new(BlackholeSink)),
        other => Err(StrataError::UnknownSinkScheme(other.to_string())),
    }
}

/// Build an in-memory sink from an `inmem://` URL
pub fn inmem_sink_from_url(url: &Url) -> Result<InmemSink> {
    let interval = duration_param(url, "interval")?;
    let retain = duration_param(url, "retain")?;
    InmemSink::new(interval, retain)
}

fn duration_param(url: &Url, name: &str) -> Result<Duration> {
    let value = url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| StrataError::config(format!("missing '{name}' param")))?;

    humantime::parse_duration(&value)
        .map_err(|e| StrataError::config(format!("bad '{name}' param {value:?}: {e}")))
}
