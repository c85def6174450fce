//! JSON-lines activity log reader.
//!
//! Each non-blank line parses to one record. Blank lines after the last
//! record (a trailing newline, an editor-added empty line) are ignored; a
//! blank line followed by more records is an error, since it would shift
//! every later record's step index.

use std::io::BufRead;

use serde::de::DeserializeOwned;
use tempnet_types::{ActiveRecord, SnapshotRecord};

use crate::error::{LogError, LogKind};

/// Parse a snapshot log. Record `t` is the adjacency at time `t`.
///
/// # Errors
///
/// Returns [`LogError::Read`], [`LogError::Malformed`], or
/// [`LogError::BlankLine`] with the offending 1-based line number.
pub fn read_snapshot_log<R: BufRead>(reader: R) -> Result<Vec<SnapshotRecord>, LogError> {
    read_records(reader, LogKind::Snapshot)
}

/// Parse an active-node log. Record `s` is the active set of step `s`.
///
/// # Errors
///
/// See [`read_snapshot_log`].
pub fn read_active_log<R: BufRead>(reader: R) -> Result<Vec<ActiveRecord>, LogError> {
    read_records(reader, LogKind::Active)
}

fn read_records<R: BufRead, T: DeserializeOwned>(
    reader: R,
    log: LogKind,
) -> Result<Vec<T>, LogError> {
    let mut records = Vec::new();
    let mut first_blank: Option<usize> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index.saturating_add(1);
        let line = line.map_err(|source| LogError::Read {
            log,
            line: line_number,
            source,
        })?;

        if line.trim().is_empty() {
            first_blank.get_or_insert(line_number);
            continue;
        }
        if let Some(blank) = first_blank {
            return Err(LogError::BlankLine { log, line: blank });
        }

        let record = serde_json::from_str(&line).map_err(|source| LogError::Malformed {
            log,
            line: line_number,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}
