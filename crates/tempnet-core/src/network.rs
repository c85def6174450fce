//! Mutable aggregate network: symmetric neighbour sets plus per-node
//! activity propensities.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Each node owns an ordered
//! neighbour set and a propensity. The arena only grows: ties are never
//! removed and ids are never reused.
//!
//! # Invariants
//!
//! - `j` is a neighbour of `i` iff `i` is a neighbour of `j`.
//! - No node is its own neighbour; a neighbour set holds each id once.
//! - Ids form the contiguous range `0..node_count`.

use std::collections::BTreeSet;

use rand::Rng;
use tempnet_types::{NodeId, SnapshotRecord};

use crate::sampler::PowerLaw;

/// Errors that can occur when mutating or querying the network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// An id outside `0..node_count` was referenced.
    #[error("node {node} not found (network has {node_count} nodes)")]
    NodeNotFound {
        /// The unknown id.
        node: NodeId,
        /// Node count at the time of the lookup.
        node_count: usize,
    },

    /// A tie from a node to itself was requested.
    #[error("self-loop requested on node {0}")]
    SelfLoop(NodeId),

    /// The tie already exists in the aggregate graph.
    #[error("tie ({a}, {b}) already exists")]
    DuplicateTie {
        /// First endpoint.
        a: NodeId,
        /// Second endpoint.
        b: NodeId,
    },

    /// The arena is full: the next id does not fit the id width.
    #[error("node id space exhausted at {0} nodes")]
    IdSpaceExhausted(usize),
}

/// Per-node arena entry.
#[derive(Debug, Clone, PartialEq)]
struct NodeEntry {
    neighbors: BTreeSet<NodeId>,
    propensity: f64,
}

/// The aggregate graph together with the propensity vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkState {
    nodes: Vec<NodeEntry>,
}

impl NetworkState {
    /// An empty network.
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// The complete graph over `n` nodes, with propensities drawn from
    /// `power_law` in id order.
    pub fn complete(n: u32, power_law: &PowerLaw, rng: &mut impl Rng) -> Self {
        let mut state = Self::new();
        for raw in 0..n {
            let id = NodeId::new(raw);
            let neighbors = (0..n).filter(|&other| other != raw).map(NodeId::new).collect();
            debug_assert_eq!(id.index(), state.nodes.len());
            state.nodes.push(NodeEntry {
                neighbors,
                propensity: power_law.sample(rng),
            });
        }
        state
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of ties (sum of degrees / 2).
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum::<usize>() / 2
    }

    /// Whether `node` exists.
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter_map(NodeId::from_index)
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry, NetworkError> {
        self.nodes.get(node.index()).ok_or(NetworkError::NodeNotFound {
            node,
            node_count: self.nodes.len(),
        })
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry, NetworkError> {
        let node_count = self.nodes.len();
        self.nodes
            .get_mut(node.index())
            .ok_or(NetworkError::NodeNotFound { node, node_count })
    }

    /// Degree of `node` (size of its neighbour set).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn degree(&self, node: NodeId) -> Result<usize, NetworkError> {
        Ok(self.entry(node)?.neighbors.len())
    }

    /// Degree of every node, indexed by id.
    pub fn degrees(&self) -> Vec<usize> {
        self.nodes.iter().map(|n| n.neighbors.len()).collect()
    }

    /// Neighbour set of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn neighbors(&self, node: NodeId) -> Result<&BTreeSet<NodeId>, NetworkError> {
        Ok(&self.entry(node)?.neighbors)
    }

    /// Whether the tie `(a, b)` exists.
    pub fn has_tie(&self, a: NodeId, b: NodeId) -> bool {
        self.entry(a).is_ok_and(|entry| entry.neighbors.contains(&b))
    }

    /// Activity propensity of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn propensity(&self, node: NodeId) -> Result<f64, NetworkError> {
        Ok(self.entry(node)?.propensity)
    }

    /// Activity propensity of every node, indexed by id.
    pub fn propensities(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.propensity).collect()
    }

    /// Overwrite the propensity of `node`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn set_propensity(&mut self, node: NodeId, propensity: f64) -> Result<(), NetworkError> {
        self.entry_mut(node)?.propensity = propensity;
        Ok(())
    }

    /// Replace the propensity of `node` with a fresh draw.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn renew_propensity(
        &mut self,
        node: NodeId,
        power_law: &PowerLaw,
        rng: &mut impl Rng,
    ) -> Result<f64, NetworkError> {
        let entry = self.entry_mut(node)?;
        entry.propensity = power_law.sample(rng);
        Ok(entry.propensity)
    }

    /// Insert the undirected tie `(a, b)`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::SelfLoop`] when `a == b`,
    /// [`NetworkError::NodeNotFound`] for an unknown endpoint, and
    /// [`NetworkError::DuplicateTie`] when the tie already exists. A failed
    /// call leaves the network unchanged.
    pub fn add_tie(&mut self, a: NodeId, b: NodeId) -> Result<(), NetworkError> {
        if a == b {
            return Err(NetworkError::SelfLoop(a));
        }
        self.entry(b)?;
        let duplicate = self.entry(a)?.neighbors.contains(&b);
        debug_assert!(!duplicate, "duplicate tie ({a}, {b})");
        if duplicate {
            return Err(NetworkError::DuplicateTie { a, b });
        }
        self.entry_mut(a)?.neighbors.insert(b);
        self.entry_mut(b)?.neighbors.insert(a);
        Ok(())
    }

    /// Append a node tied to each of `ties`, with a fresh propensity.
    ///
    /// Returns the new id, which equals the previous node count.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] if any target is unknown,
    /// [`NetworkError::DuplicateTie`] if `ties` repeats an id, or
    /// [`NetworkError::IdSpaceExhausted`]. Targets are checked before the node
    /// is appended, so a failed call leaves the network unchanged.
    pub fn add_node(
        &mut self,
        ties: &[NodeId],
        power_law: &PowerLaw,
        rng: &mut impl Rng,
    ) -> Result<NodeId, NetworkError> {
        let id = NodeId::from_index(self.nodes.len())
            .ok_or(NetworkError::IdSpaceExhausted(self.nodes.len()))?;

        let mut neighbors = BTreeSet::new();
        for &target in ties {
            self.entry(target)?;
            if !neighbors.insert(target) {
                return Err(NetworkError::DuplicateTie { a: id, b: target });
            }
        }
        for &target in &neighbors {
            self.entry_mut(target)?.neighbors.insert(id);
        }
        self.nodes.push(NodeEntry {
            neighbors,
            propensity: power_law.sample(rng),
        });
        Ok(id)
    }

    /// Every node except `node` and its current neighbours, ascending.
    ///
    /// This is the pool an exploring node may form a new tie with.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeNotFound`] for an unknown id.
    pub fn complement_of(&self, node: NodeId) -> Result<Vec<NodeId>, NetworkError> {
        let neighbors = self.neighbors(node)?;
        Ok(self
            .node_ids()
            .filter(|&other| other != node && !neighbors.contains(&other))
            .collect())
    }

    /// The full adjacency as a record (one ascending neighbour list per node).
    pub fn adjacency(&self) -> SnapshotRecord {
        SnapshotRecord::new(
            self.nodes
                .iter()
                .map(|n| n.neighbors.iter().copied().collect())
                .collect(),
        )
    }

    /// Whether the symmetry and self-loop invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.node_ids().all(|node| {
            self.neighbors(node).is_ok_and(|neighbors| {
                neighbors.iter().all(|&other| {
                    other != node && self.contains(other) && self.has_tie(other, node)
                })
            })
        })
    }
}
