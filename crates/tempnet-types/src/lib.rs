//! Shared type definitions for the tempnet temporal network generator.
//!
//! This crate holds the plain data exchanged between the evolution engine,
//! the activity log, and the replay/analysis layer. It has no behaviour
//! beyond construction helpers and lookups.
//!
//! # Modules
//!
//! - [`ids`] -- Dense node identifiers and undirected ties
//! - [`records`] -- Per-step records persisted to the activity log and the
//!   end-of-run summary

pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use ids::{NodeId, Tie};
pub use records::{ActiveRecord, RunSummary, SnapshotRecord};
