//! Activity log persistence, replay, and distribution statistics for the
//! tempnet temporal network generator.
//!
//! # Modules
//!
//! - [`error`] -- [`LogError`] with log kind and line context.
//! - [`writer`] -- [`ActivityLog`], the JSON-lines [`ActivitySink`], plus the
//!   run summary file.
//! - [`reader`] -- Line-by-line parsers for both logs.
//! - [`replay`] -- [`ActivityHistory`] queries over a finished run.
//! - [`stats`] -- CCDF, activity counts, and min/max/mean summaries.
//!
//! [`ActivitySink`]: tempnet_core::runner::ActivitySink

pub mod error;
pub mod reader;
pub mod replay;
pub mod stats;
pub mod writer;

pub use error::{LogError, LogKind};
pub use replay::{ActivityHistory, Adjacency};
pub use writer::{ActivityLog, LogFiles, read_summary, write_summary};
