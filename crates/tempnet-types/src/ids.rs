//! Dense node identifiers and undirected ties.
//!
//! Nodes are numbered from zero in creation order. An id is assigned exactly
//! once and never reused, so the set of live ids is always the contiguous
//! range `0..node_count`. Ids double as arena indices into every per-node
//! vector the engine keeps.

use serde::{Deserialize, Serialize};

/// Identifier of a node in the temporal network.
///
/// Serialises as a bare integer so that log lines stay plain nested
/// integer lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create an identifier from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Return the raw integer value.
    pub const fn into_inner(self) -> u32 {
        self.0
    }

    /// Return the id as an arena index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert an arena index back into an id.
    ///
    /// Returns `None` if the index does not fit the id width.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// An undirected tie between two distinct nodes.
///
/// The endpoints are stored in ascending order, so `Tie::new(a, b)` and
/// `Tie::new(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tie {
    low: NodeId,
    high: NodeId,
}

impl Tie {
    /// Build a tie from two endpoints in any order.
    ///
    /// Returns `None` for a self-loop.
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            core::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            core::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            core::cmp::Ordering::Equal => None,
        }
    }

    /// The endpoint with the smaller id.
    pub const fn low(self) -> NodeId {
        self.low
    }

    /// The endpoint with the larger id.
    pub const fn high(self) -> NodeId {
        self.high
    }

    /// Whether `node` is one of the endpoints.
    pub fn touches(self, node: NodeId) -> bool {
        self.low == node || self.high == node
    }
}

impl core::fmt::Display for Tie {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}
