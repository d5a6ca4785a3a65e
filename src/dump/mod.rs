//! Human-readable dumps of the in-memory sink.
//!
//! [`SignalDumper`] writes every completed interval when the process gets
//! SIGUSR1 (Ctrl-Break on Windows). [`FileDumper`] periodically rewrites a
//! file with the interval currently being aggregated.

pub mod file;
pub mod signal;

pub use file::{render_file_dump, FileDumper, FormattedParam, SampleFormatter, SampleParam};
pub use signal::{write_signal_dump, SignalDumper};
