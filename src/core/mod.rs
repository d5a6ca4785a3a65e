//! Core types shared by every strata component.
//!
//! This module contains the error taxonomy, configuration, the clock
//! abstraction used for bucketing, and the label type.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigBuilder, MetricServiceConfig};
pub use error::{Result, StrataError};
pub use types::Label;
