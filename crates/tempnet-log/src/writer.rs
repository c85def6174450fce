//! JSON-lines activity log writer.
//!
//! Two append-only streams, one record per line:
//!
//! ```text
//! snapshots.jsonl      line 0: seed adjacency   [[1,2,3],[0,2,3],...]
//!                      line t: snapshot of t    [[],[4],[],[],[1]]
//! active_nodes.jsonl   line s: active set of s  [0,3]
//! ```
//!
//! Every record is flushed before the sink call returns, so the files on
//! disk are complete up to the last finished step even if the process dies.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempnet_core::config::OutputConfig;
use tempnet_core::evolution::StepOutcome;
use tempnet_core::runner::ActivitySink;
use tempnet_types::{RunSummary, SnapshotRecord};
use tracing::debug;

use crate::error::LogError;

/// File names of the run outputs inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    /// Snapshot log file name.
    pub snapshot: String,
    /// Active-node log file name.
    pub active: String,
    /// Run summary file name.
    pub summary: String,
}

impl Default for LogFiles {
    fn default() -> Self {
        Self {
            snapshot: "snapshots.jsonl".to_owned(),
            active: "active_nodes.jsonl".to_owned(),
            summary: "summary.json".to_owned(),
        }
    }
}

impl From<&OutputConfig> for LogFiles {
    fn from(output: &OutputConfig) -> Self {
        Self {
            snapshot: output.snapshot_file.clone(),
            active: output.active_file.clone(),
            summary: output.summary_file.clone(),
        }
    }
}

impl LogFiles {
    /// Path of the snapshot log inside `dir`.
    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.snapshot)
    }

    /// Path of the active-node log inside `dir`.
    pub fn active_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.active)
    }

    /// Path of the run summary inside `dir`.
    pub fn summary_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.summary)
    }
}

/// An [`ActivitySink`] that writes both logs as JSON lines.
#[derive(Debug)]
pub struct ActivityLog<W: Write> {
    snapshots: W,
    active: W,
    snapshot_lines: usize,
    active_lines: usize,
}

impl<W: Write> ActivityLog<W> {
    /// Wrap two writers.
    pub const fn new(snapshots: W, active: W) -> Self {
        Self {
            snapshots,
            active,
            snapshot_lines: 0,
            active_lines: 0,
        }
    }

    /// Lines written to the snapshot log so far.
    pub const fn snapshot_lines(&self) -> usize {
        self.snapshot_lines
    }

    /// Lines written to the active-node log so far.
    pub const fn active_lines(&self) -> usize {
        self.active_lines
    }

    /// Unwrap into `(snapshot writer, active writer)`.
    pub fn into_inner(self) -> (W, W) {
        (self.snapshots, self.active)
    }
}

impl ActivityLog<BufWriter<File>> {
    /// Create (or truncate) both log files inside `dir`, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if the directory or a file cannot be created.
    pub fn create(dir: &Path, files: &LogFiles) -> Result<Self, LogError> {
        fs::create_dir_all(dir).map_err(|source| LogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let snapshot_path = files.snapshot_path(dir);
        let active_path = files.active_path(dir);
        let snapshots = create_file(&snapshot_path)?;
        let active = create_file(&active_path)?;
        debug!(
            snapshot_log = %snapshot_path.display(),
            active_log = %active_path.display(),
            "Activity log created"
        );
        Ok(Self::new(BufWriter::new(snapshots), BufWriter::new(active)))
    }
}

fn create_file(path: &Path) -> Result<File, LogError> {
    File::create(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialise one record onto its own line and flush.
fn write_line<W: Write, T: Serialize + ?Sized>(out: &mut W, record: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")?;
    out.flush()
}

impl<W: Write> ActivitySink for ActivityLog<W> {
    fn record_seed(&mut self, seed: &SnapshotRecord) -> io::Result<()> {
        write_line(&mut self.snapshots, seed)?;
        self.snapshot_lines = self.snapshot_lines.saturating_add(1);
        Ok(())
    }

    fn record_step(&mut self, outcome: &StepOutcome) -> io::Result<()> {
        write_line(&mut self.snapshots, &outcome.snapshot)?;
        self.snapshot_lines = self.snapshot_lines.saturating_add(1);
        write_line(&mut self.active, &outcome.active)?;
        self.active_lines = self.active_lines.saturating_add(1);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.snapshots.flush()?;
        self.active.flush()
    }
}

/// Write the run summary as pretty JSON.
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be written, or
/// [`LogError::Summary`] if serialisation fails.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), LogError> {
    let json = serde_json::to_string_pretty(summary).map_err(|source| LogError::Summary {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a run summary written by [`write_summary`].
///
/// # Errors
///
/// Returns [`LogError::Io`] if the file cannot be read, or
/// [`LogError::Summary`] if it is not a valid summary.
pub fn read_summary(path: &Path) -> Result<RunSummary, LogError> {
    let contents = fs::read_to_string(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| LogError::Summary {
        path: path.to_path_buf(),
        source,
    })
}
