//! Replay of a finished run from its activity logs.
//!
//! Time coordinates: `t = 0` is the seed network and the step with loop
//! index `s` is time `t = s + 1`. Snapshot-log line `t` describes time `t`;
//! the active set of time `t >= 1` is active-log line `t - 1`. Nothing is
//! active at `t = 0`.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tempnet_types::{ActiveRecord, NodeId, SnapshotRecord, Tie};
use tracing::{debug, warn};

use crate::error::LogError;
use crate::reader::{read_active_log, read_snapshot_log};
use crate::writer::LogFiles;

/// Undirected adjacency reconstructed from one or more snapshot lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    neighbors: Vec<BTreeSet<NodeId>>,
}

impl Adjacency {
    /// Adjacency of a single snapshot line.
    pub fn from_snapshot(snapshot: &SnapshotRecord) -> Self {
        let mut adjacency = Self::default();
        adjacency.merge(snapshot);
        adjacency
    }

    /// Add every tie of `snapshot`, growing the node range as needed.
    pub fn merge(&mut self, snapshot: &SnapshotRecord) {
        if self.neighbors.len() < snapshot.node_count() {
            self.neighbors.resize(snapshot.node_count(), BTreeSet::new());
        }
        for tie in snapshot.ties() {
            self.insert(tie);
        }
    }

    fn insert(&mut self, tie: Tie) {
        let needed = tie.high().index().saturating_add(1);
        if self.neighbors.len() < needed {
            self.neighbors.resize(needed, BTreeSet::new());
        }
        if let Some(set) = self.neighbors.get_mut(tie.low().index()) {
            set.insert(tie.high());
        }
        if let Some(set) = self.neighbors.get_mut(tie.high().index()) {
            set.insert(tie.low());
        }
    }

    /// Number of nodes covered.
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of undirected ties.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Whether `a` and `b` are tied.
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors
            .get(a.index())
            .is_some_and(|set| set.contains(&b))
    }

    /// Neighbours of `node`, or `None` if it is out of range.
    pub fn neighbors(&self, node: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.neighbors.get(node.index())
    }

    /// Degree of every node, indexed by id.
    pub fn degrees(&self) -> Vec<usize> {
        self.neighbors.iter().map(BTreeSet::len).collect()
    }

    /// Every tie once, ordered by `(low, high)`.
    pub fn ties(&self) -> impl Iterator<Item = Tie> + '_ {
        self.neighbors.iter().enumerate().flat_map(|(index, set)| {
            NodeId::from_index(index)
                .into_iter()
                .flat_map(move |node| set.iter().filter_map(move |&other| Tie::new(node, other)))
                .filter(move |tie| tie.low().index() == index)
        })
    }

    /// Dense 0/1 matrix, row `i` column `j` set iff `i` and `j` are tied.
    pub fn to_dense(&self) -> Vec<Vec<u8>> {
        let n = self.neighbors.len();
        self.neighbors
            .iter()
            .map(|set| {
                let mut row = vec![0_u8; n];
                for other in set {
                    if let Some(cell) = row.get_mut(other.index()) {
                        *cell = 1;
                    }
                }
                row
            })
            .collect()
    }
}

/// A parsed pair of activity logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityHistory {
    snapshots: Vec<SnapshotRecord>,
    active: Vec<ActiveRecord>,
}

impl ActivityHistory {
    /// Pair up parsed records.
    ///
    /// A step writes its snapshot line before its active line, so a run that
    /// died between the two leaves one extra snapshot line. That partial step
    /// is dropped and the history ends at the last complete step.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::MissingSeed`] without a seed line, or
    /// [`LogError::StepCountMismatch`] when the logs differ by more than one
    /// partial step.
    pub fn from_records(
        mut snapshots: Vec<SnapshotRecord>,
        active: Vec<ActiveRecord>,
    ) -> Result<Self, LogError> {
        if snapshots.is_empty() {
            return Err(LogError::MissingSeed);
        }
        let complete = active.len().saturating_add(1);
        let partial = complete.saturating_add(1);
        if snapshots.len() == partial {
            warn!(
                complete_steps = active.len(),
                "Snapshot log ends with a partial step, dropping it"
            );
            snapshots.truncate(complete);
        }
        if snapshots.len() != complete {
            return Err(LogError::StepCountMismatch {
                snapshots: snapshots.len(),
                active: active.len(),
            });
        }
        Ok(Self { snapshots, active })
    }

    /// Parse both logs from readers.
    ///
    /// # Errors
    ///
    /// Any parse error of either log, or an error of
    /// [`ActivityHistory::from_records`].
    pub fn from_readers<S: BufRead, A: BufRead>(snapshots: S, active: A) -> Result<Self, LogError> {
        Self::from_records(read_snapshot_log(snapshots)?, read_active_log(active)?)
    }

    /// Load both logs from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if a file cannot be opened, or any error of
    /// [`ActivityHistory::from_readers`].
    pub fn load(dir: &Path, files: &LogFiles) -> Result<Self, LogError> {
        let snapshot_path = files.snapshot_path(dir);
        let active_path = files.active_path(dir);
        let snapshots = open(&snapshot_path)?;
        let active = open(&active_path)?;
        let history = Self::from_readers(snapshots, active)?;
        debug!(
            snapshot_log = %snapshot_path.display(),
            steps = history.steps(),
            "Activity history loaded"
        );
        Ok(history)
    }

    /// Number of steps recorded.
    pub fn steps(&self) -> usize {
        self.active.len()
    }

    /// All snapshot lines, seed first.
    pub fn snapshots(&self) -> &[SnapshotRecord] {
        &self.snapshots
    }

    /// All active sets, step 0 first.
    pub fn active_sets(&self) -> &[ActiveRecord] {
        &self.active
    }

    /// Whether the tie `(a, b)` is live at time `t`.
    pub fn edge_active_at(&self, a: NodeId, b: NodeId, t: usize) -> bool {
        self.snapshots
            .get(t)
            .is_some_and(|snapshot| snapshot.contains_tie(a, b))
    }

    /// Whether `node` is active at time `t`. Always false at `t = 0`.
    pub fn node_active_at(&self, node: NodeId, t: usize) -> bool {
        t.checked_sub(1)
            .and_then(|step| self.active.get(step))
            .is_some_and(|active| active.contains(node))
    }

    /// Adjacency of snapshot line `t` alone.
    pub fn snapshot_at(&self, t: usize) -> Option<Adjacency> {
        self.snapshots.get(t).map(Adjacency::from_snapshot)
    }

    /// Cumulative adjacency of snapshot lines `0..=t`.
    pub fn adjacency_at(&self, t: usize) -> Option<Adjacency> {
        let lines = self.snapshots.get(..=t)?;
        let mut adjacency = Adjacency::default();
        for snapshot in lines {
            adjacency.merge(snapshot);
        }
        Some(adjacency)
    }

    /// Union of every snapshot line: the final aggregate network.
    pub fn aggregate(&self) -> Adjacency {
        let mut adjacency = Adjacency::default();
        for snapshot in &self.snapshots {
            adjacency.merge(snapshot);
        }
        adjacency
    }

    /// Every time at which the tie `(a, b)` is live.
    pub fn edge_timeline(&self, a: NodeId, b: NodeId) -> Vec<usize> {
        self.snapshots
            .iter()
            .enumerate()
            .filter(|(_, snapshot)| snapshot.contains_tie(a, b))
            .map(|(t, _)| t)
            .collect()
    }

    /// Every time at which `node` is active.
    pub fn node_timeline(&self, node: NodeId) -> Vec<usize> {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, active)| active.contains(node))
            .map(|(step, _)| step.saturating_add(1))
            .collect()
    }
}

fn open(path: &Path) -> Result<BufReader<File>, LogError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LogError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SNAPSHOTS: &str = "\
[[1,2],[0,2],[0,1]]
[[],[3],[],[1]]
[[4],[],[],[],[0]]
";
    const ACTIVE: &str = "\
[1,3]
[0]
";

    fn n(raw: u32) -> NodeId {
        NodeId::new(raw)
    }

    fn history() -> ActivityHistory {
        ActivityHistory::from_readers(SNAPSHOTS.as_bytes(), ACTIVE.as_bytes()).unwrap()
    }

    #[test]
    fn step_count_comes_from_active_log() {
        assert_eq!(history().steps(), 2);
    }

    #[test]
    fn edge_activity_reads_one_line() {
        let h = history();
        assert!(h.edge_active_at(n(0), n(1), 0));
        assert!(!h.edge_active_at(n(0), n(1), 1));
        assert!(h.edge_active_at(n(3), n(1), 1));
        assert!(h.edge_active_at(n(4), n(0), 2));
        assert!(!h.edge_active_at(n(0), n(4), 3));
    }

    #[test]
    fn nothing_is_active_at_seed_time() {
        let h = history();
        for node in 0..5 {
            assert!(!h.node_active_at(n(node), 0));
        }
        assert!(h.node_active_at(n(1), 1));
        assert!(h.node_active_at(n(3), 1));
        assert!(h.node_active_at(n(0), 2));
        assert!(!h.node_active_at(n(1), 2));
        assert!(!h.node_active_at(n(0), 3));
    }

    #[test]
    fn adjacency_accumulates_lines() {
        let h = history();
        let t0 = h.adjacency_at(0).unwrap();
        assert_eq!(t0.node_count(), 3);
        assert_eq!(t0.edge_count(), 3);

        let t1 = h.adjacency_at(1).unwrap();
        assert_eq!(t1.node_count(), 4);
        assert_eq!(t1.edge_count(), 4);
        assert!(t1.has_edge(n(1), n(3)));

        let t2 = h.adjacency_at(2).unwrap();
        assert_eq!(t2, h.aggregate());
        assert_eq!(t2.degrees(), vec![3, 3, 2, 1, 1]);
        assert!(h.adjacency_at(3).is_none());
    }

    #[test]
    fn snapshot_at_is_not_cumulative() {
        let h = history();
        let s1 = h.snapshot_at(1).unwrap();
        assert_eq!(s1.edge_count(), 1);
        assert!(!s1.has_edge(n(0), n(1)));
    }

    #[test]
    fn dense_matrix_is_symmetric() {
        let dense = history().aggregate().to_dense();
        assert_eq!(dense.len(), 5);
        for (i, row) in dense.iter().enumerate() {
            assert_eq!(row.len(), 5);
            assert_eq!(row[i], 0);
            for (j, &cell) in row.iter().enumerate() {
                assert_eq!(cell, dense[j][i]);
            }
        }
        assert_eq!(dense[0], vec![0, 1, 1, 0, 1]);
    }

    #[test]
    fn ties_are_listed_once() {
        let ties: Vec<Tie> = history().aggregate().ties().collect();
        assert_eq!(ties.len(), 5);
        assert_eq!(ties[0], Tie::new(n(0), n(1)).unwrap());
        assert!(ties.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn timelines_use_time_coordinates() {
        let h = history();
        assert_eq!(h.edge_timeline(n(0), n(1)), vec![0]);
        assert_eq!(h.edge_timeline(n(0), n(4)), vec![2]);
        assert_eq!(h.node_timeline(n(1)), vec![1]);
        assert_eq!(h.node_timeline(n(0)), vec![2]);
        assert!(h.node_timeline(n(2)).is_empty());
    }

    #[test]
    fn missing_seed_is_rejected() {
        let result = ActivityHistory::from_readers("".as_bytes(), "".as_bytes());
        assert!(matches!(result, Err(LogError::MissingSeed)));
    }

    #[test]
    fn trailing_partial_step_is_dropped() {
        let h = ActivityHistory::from_readers(SNAPSHOTS.as_bytes(), "[1,3]\n".as_bytes()).unwrap();
        assert_eq!(h.steps(), 1);
        assert_eq!(h.snapshots().len(), 2);
        assert!(h.adjacency_at(2).is_none());
        assert_eq!(h.aggregate().edge_count(), 4);
    }

    #[test]
    fn mismatched_logs_are_rejected() {
        let result = ActivityHistory::from_readers(SNAPSHOTS.as_bytes(), "".as_bytes());
        assert!(matches!(
            result,
            Err(LogError::StepCountMismatch { snapshots: 3, active: 0 })
        ));
        let result =
            ActivityHistory::from_readers("[[1],[0]]\n".as_bytes(), "[0]\n".as_bytes());
        assert!(matches!(
            result,
            Err(LogError::StepCountMismatch { snapshots: 1, active: 1 })
        ));
    }
}
