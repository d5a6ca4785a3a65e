use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid interval configuration: interval {interval:?}, retain {retain:?}")]
    InvalidInterval { interval: Duration, retain: Duration },

    #[error("No metric intervals have been initialized yet")]
    NoIntervals,

    #[error("Cannot create metric sink, unrecognized sink name: {0:?}")]
    UnknownSinkScheme(String),

    #[error("Invalid sink URL: {0}")]
    InvalidSinkUrl(#[from] url::ParseError),

    #[error("A global metric service is already installed")]
    GlobalAlreadyInstalled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Network error: {0}")]
    Network(String),
}

/// Result type alias for strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Returns true if retrying the failed operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::NoIntervals => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidInterval { .. } => "config",
            Self::NoIntervals => "empty",
            Self::UnknownSinkScheme(_) | Self::InvalidSinkUrl(_) => "endpoint",
            Self::GlobalAlreadyInstalled => "global",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Join(_) => "async",
            Self::Network(_) => "network",
        }
    }
}
