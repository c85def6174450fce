//! Records emitted once per step and the end-of-run summary.
//!
//! Both per-step records serialise transparently to nested integer lists,
//! which is exactly one JSON line in the activity log:
//!
//! ```text
//! snapshot line : [[1,2],[0],[0],[]]
//! active line   : [0,2]
//! ```
//!
//! An empty list is written as `[]`, never omitted, so a step in which
//! nothing happened is still distinguishable from a missing step.

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, Tie};

/// Per-node neighbour lists describing the ties live at one instant.
///
/// Position `i` in the outer list holds the neighbours of node `i`. Record 0
/// of a run is the full seed adjacency; every later record is the
/// instantaneous snapshot of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotRecord(Vec<Vec<NodeId>>);

impl SnapshotRecord {
    /// Wrap prepared neighbour lists.
    pub const fn new(lists: Vec<Vec<NodeId>>) -> Self {
        Self(lists)
    }

    /// A record over `node_count` nodes with no live ties.
    pub fn empty(node_count: usize) -> Self {
        Self(vec![Vec::new(); node_count])
    }

    /// Number of per-node lists (the node count at the time of the record).
    pub fn node_count(&self) -> usize {
        self.0.len()
    }

    /// Neighbours of `node`, or an empty slice when `node` is beyond the
    /// record (the node did not exist yet).
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.0.get(node.index()).map_or(&[], Vec::as_slice)
    }

    /// Whether the tie `(a, b)` appears in the record.
    pub fn contains_tie(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Every tie in the record, each reported once.
    pub fn ties(&self) -> impl Iterator<Item = Tie> + '_ {
        self.0.iter().enumerate().flat_map(|(index, neighbors)| {
            neighbors.iter().filter_map(move |&other| {
                let node = NodeId::from_index(index)?;
                if node < other { Tie::new(node, other) } else { None }
            })
        })
    }

    /// Number of distinct ties in the record.
    pub fn tie_count(&self) -> usize {
        self.ties().count()
    }

    /// Borrow the raw neighbour lists.
    pub fn lists(&self) -> &[Vec<NodeId>] {
        &self.0
    }

    /// Consume the record into its raw neighbour lists.
    pub fn into_lists(self) -> Vec<Vec<NodeId>> {
        self.0
    }
}

/// Ids of the nodes whose activation trial succeeded in one step, ascending.
///
/// Deserialisation goes through [`ActiveRecord::new`], so a record read from
/// any source is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NodeId>", into = "Vec<NodeId>")]
pub struct ActiveRecord(Vec<NodeId>);

impl From<Vec<NodeId>> for ActiveRecord {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self::new(nodes)
    }
}

impl From<ActiveRecord> for Vec<NodeId> {
    fn from(record: ActiveRecord) -> Self {
        record.0
    }
}

impl ActiveRecord {
    /// Build a record, sorting and de-duplicating the ids.
    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        nodes.sort_unstable();
        nodes.dedup();
        Self(nodes)
    }

    /// Whether `node` was active.
    pub fn contains(&self, node: NodeId) -> bool {
        self.0.binary_search(&node).is_ok()
    }

    /// Number of active nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no node was active.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the active ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    /// Borrow the ids.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }
}

/// Summary statistics reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed of the random stream that drove the run.
    pub seed: u64,
    /// Number of steps requested by the configuration.
    pub steps_requested: u64,
    /// Number of steps actually executed.
    pub steps_executed: u64,
    /// Node count of the final aggregate graph.
    pub node_count: usize,
    /// Tie count of the final aggregate graph (sum of degrees / 2).
    pub edge_count: usize,
}
