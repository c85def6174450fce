//! Error types for the activity log.
//!
//! Parse errors carry the log they came from and the 1-based line number so
//! a corrupted file can be located without re-reading it.

use std::io;
use std::path::PathBuf;

/// Which of the two line-oriented logs a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// The snapshot log (one adjacency per line).
    Snapshot,
    /// The active-node log (one active set per line).
    Active,
}

impl core::fmt::Display for LogKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot log"),
            Self::Active => write!(f, "active-node log"),
        }
    }
}

/// Errors that can occur while writing or reading activity logs.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A file could not be created, opened, or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Reading a log stream failed.
    #[error("failed to read {log} at line {line}: {source}")]
    Read {
        /// The log being read.
        log: LogKind,
        /// 1-based line number.
        line: usize,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A log line is not a valid record.
    #[error("malformed record in {log} at line {line}: {source}")]
    Malformed {
        /// The log being read.
        log: LogKind,
        /// 1-based line number.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A blank line appears before the last record.
    #[error("blank line in {log} at line {line}")]
    BlankLine {
        /// The log being read.
        log: LogKind,
        /// 1-based line number.
        line: usize,
    },

    /// The snapshot log has no seed line.
    #[error("snapshot log is empty; expected the seed adjacency on line 1")]
    MissingSeed,

    /// The two logs do not describe the same number of steps.
    #[error("snapshot log has {snapshots} lines but active-node log has {active}; expected one more snapshot than active sets")]
    StepCountMismatch {
        /// Lines in the snapshot log.
        snapshots: usize,
        /// Lines in the active-node log.
        active: usize,
    },

    /// The run summary could not be serialised or parsed.
    #[error("summary error on {}: {source}", path.display())]
    Summary {
        /// The summary file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}
