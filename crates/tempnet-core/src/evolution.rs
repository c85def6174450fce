//! Evolution step: the per-step state transition of the temporal network.
//!
//! Each step runs through these phases, always in this order:
//!
//! 1. **Degree snapshot** -- record every node's degree at step start. All
//!    degree-dependent decisions in the step read this snapshot, never the
//!    live degrees.
//!
//! 2. **Activation** -- node `i` is active iff its propensity exceeds a
//!    uniform draw.
//!
//! 3. **Partition** -- an active node explores with probability
//!    `rho * degree^(-gam) / (step + 1)`, otherwise it reinforces. Isolated
//!    nodes always explore.
//!
//! 4. **Exploration** -- each explorer (ascending id) ties to one node outside
//!    its current neighbourhood, chosen proportionally to step-start degree.
//!    An explorer with no candidate is skipped.
//!
//! 5. **Reinforcement** -- each reinforcer confirms its existing ties to other
//!    active nodes.
//!
//! 6. **Growth** -- unless the growth cap is reached, one node joins with `m`
//!    ties to distinct existing nodes chosen proportionally to step-start
//!    degree.
//!
//! 7. **Renewal** -- every active node draws a fresh propensity.
//!
//! The returned [`StepOutcome`] carries the step's instantaneous snapshot and
//! active set; persisting it (phase 8) is the caller's job.

use std::collections::BTreeSet;

use rand::Rng;
use tempnet_types::{ActiveRecord, NodeId, SnapshotRecord};
use tracing::{debug, trace};

use crate::config::ModelParams;
use crate::network::{NetworkError, NetworkState};
use crate::sampler::{self, SamplerError};

/// Errors that can occur during a step.
///
/// Both variants signal a broken engine invariant (a duplicate tie, or a
/// preferential draw over a candidate set with no weight); a run cannot
/// continue past either.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A network mutation was rejected.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },

    /// A preferential draw failed.
    #[error("sampler error: {source}")]
    Sampler {
        /// The underlying sampler error.
        #[from]
        source: SamplerError,
    },
}

/// Everything a single step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Zero-based index of the step.
    pub step: u64,
    /// Nodes whose activation trial succeeded.
    pub active: ActiveRecord,
    /// Active nodes that chose to explore, ascending.
    pub explorers: Vec<NodeId>,
    /// Number of active nodes that reinforced.
    pub reinforcers: usize,
    /// Explorers that formed a tie.
    pub explored_ties: usize,
    /// The node that joined this step, if any.
    pub new_node: Option<NodeId>,
    /// Ties live during the step, one list per node (after growth).
    pub snapshot: SnapshotRecord,
}

impl StepOutcome {
    /// Number of ties created this step (exploration plus growth).
    pub fn new_ties(&self) -> usize {
        let growth = self
            .new_node
            .map_or(0, |node| self.snapshot.neighbors(node).len());
        self.explored_ties.saturating_add(growth)
    }
}

/// Per-node neighbour sets for the ties live in one step.
#[derive(Debug)]
struct SnapshotBuilder {
    lists: Vec<BTreeSet<NodeId>>,
}

impl SnapshotBuilder {
    fn new(node_count: usize) -> Self {
        Self {
            lists: vec![BTreeSet::new(); node_count],
        }
    }

    fn grow(&mut self) {
        self.lists.push(BTreeSet::new());
    }

    fn record(&mut self, a: NodeId, b: NodeId) {
        if let Some(list) = self.lists.get_mut(a.index()) {
            list.insert(b);
        }
        if let Some(list) = self.lists.get_mut(b.index()) {
            list.insert(a);
        }
    }

    fn finish(self) -> SnapshotRecord {
        SnapshotRecord::new(
            self.lists
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        )
    }
}

/// Degree as a sampling weight.
#[allow(clippy::cast_precision_loss)]
fn degree_weight(degree: usize) -> f64 {
    degree as f64
}

/// Probability that an active node with `degree` explores at `step`.
///
/// Returns `None` for an isolated node, which always explores.
#[allow(clippy::cast_precision_loss)]
pub fn explore_probability(degree: usize, rho: f64, gam: f64, step: u64) -> Option<f64> {
    if degree == 0 {
        return None;
    }
    let decay = (step as f64) + 1.0;
    Some(rho * degree_weight(degree).powf(-gam) / decay)
}

/// Execute one complete step.
///
/// `step` is the zero-based step index; it drives the global
/// `1 / (step + 1)` decay of the exploration probability.
///
/// # Errors
///
/// Returns [`StepError`] if an engine invariant is violated. The network
/// may then be partially updated and must not be used further.
pub fn run_step(
    state: &mut NetworkState,
    params: &ModelParams,
    step: u64,
    rng: &mut impl Rng,
) -> Result<StepOutcome, StepError> {
    // --- Phase 1: Degree snapshot ---
    let degrees = state.degrees();

    // --- Phase 2: Activation ---
    let active = phase_activation(state, rng);

    // --- Phase 3: Partition ---
    let (explorers, reinforcers) = phase_partition(&active, &degrees, params, step, rng);

    let mut snapshot = SnapshotBuilder::new(state.node_count());

    // --- Phase 4: Exploration ---
    let explored_ties = phase_exploration(state, &explorers, &degrees, &mut snapshot, rng)?;

    // --- Phase 5: Reinforcement ---
    phase_reinforcement(state, &active, &reinforcers, &mut snapshot)?;

    // --- Phase 6: Growth ---
    let new_node = phase_growth(state, params, &degrees, &mut snapshot, rng)?;

    // --- Phase 7: Renewal ---
    for &node in &active {
        state.renew_propensity(node, &params.power_law(), rng)?;
    }

    debug!(
        step,
        active = active.len(),
        explorers = explorers.len(),
        reinforcers = reinforcers.len(),
        explored_ties,
        new_node = new_node.map(NodeId::into_inner),
        nodes = state.node_count(),
        edges = state.edge_count(),
        "Step complete"
    );

    Ok(StepOutcome {
        step,
        active: ActiveRecord::new(active),
        explorers,
        reinforcers: reinforcers.len(),
        explored_ties,
        new_node,
        snapshot: snapshot.finish(),
    })
}

/// Phase 2: one Bernoulli trial per node, in id order.
fn phase_activation(state: &NetworkState, rng: &mut impl Rng) -> Vec<NodeId> {
    state
        .node_ids()
        .zip(state.propensities())
        .filter_map(|(node, propensity)| {
            let r: f64 = rng.random();
            (propensity > r).then_some(node)
        })
        .collect()
}

/// Phase 3: split the active set into explorers and reinforcers.
fn phase_partition(
    active: &[NodeId],
    degrees: &[usize],
    params: &ModelParams,
    step: u64,
    rng: &mut impl Rng,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let mut explorers = Vec::new();
    let mut reinforcers = Vec::new();
    for &node in active {
        let degree = degrees.get(node.index()).copied().unwrap_or(0);
        let r: f64 = rng.random();
        let explores = explore_probability(degree, params.rho(), params.gam(), step)
            .is_none_or(|p| p > r);
        if explores {
            explorers.push(node);
        } else {
            reinforcers.push(node);
        }
    }
    (explorers, reinforcers)
}

/// Phase 4: each explorer ties to one preferentially chosen non-neighbour.
///
/// Candidates are read from the live neighbour sets, so a tie formed by an
/// earlier explorer in the same step is never offered again. Weights are
/// the step-start degrees.
fn phase_exploration(
    state: &mut NetworkState,
    explorers: &[NodeId],
    degrees: &[usize],
    snapshot: &mut SnapshotBuilder,
    rng: &mut impl Rng,
) -> Result<usize, StepError> {
    let mut formed = 0_usize;
    for &node in explorers {
        let candidates = state.complement_of(node)?;
        if candidates.is_empty() {
            trace!(node = node.into_inner(), "Explorer has no candidates, skipped");
            continue;
        }
        let weights: Vec<f64> = candidates
            .iter()
            .map(|c| degree_weight(degrees.get(c.index()).copied().unwrap_or(0)))
            .collect();
        let index = sampler::weighted_index(&weights, rng)?;
        let Some(&target) = candidates.get(index) else {
            continue;
        };
        state.add_tie(node, target)?;
        snapshot.record(node, target);
        formed = formed.saturating_add(1);
    }
    Ok(formed)
}

/// Phase 5: reinforcers confirm ties to other active nodes.
fn phase_reinforcement(
    state: &NetworkState,
    active: &[NodeId],
    reinforcers: &[NodeId],
    snapshot: &mut SnapshotBuilder,
) -> Result<(), StepError> {
    let mut is_active = vec![false; state.node_count()];
    for node in active {
        if let Some(flag) = is_active.get_mut(node.index()) {
            *flag = true;
        }
    }
    for &node in reinforcers {
        for &neighbor in state.neighbors(node)? {
            if is_active.get(neighbor.index()).copied().unwrap_or(false) {
                snapshot.record(node, neighbor);
            }
        }
    }
    Ok(())
}

/// Phase 6: add one node with `m` preferential ties, unless capped.
fn phase_growth(
    state: &mut NetworkState,
    params: &ModelParams,
    degrees: &[usize],
    snapshot: &mut SnapshotBuilder,
    rng: &mut impl Rng,
) -> Result<Option<NodeId>, StepError> {
    if !params.growth().allows_growth(state.node_count()) {
        return Ok(None);
    }

    let weights: Vec<f64> = degrees.iter().copied().map(degree_weight).collect();
    let count = usize::try_from(params.edges_per_new_node()).unwrap_or(usize::MAX);
    let targets: Vec<NodeId> = sampler::weighted_distinct(&weights, count, rng)?
        .into_iter()
        .filter_map(NodeId::from_index)
        .collect();

    let new_node = state.add_node(&targets, &params.power_law(), rng)?;
    snapshot.grow();
    for &target in &targets {
        snapshot.record(new_node, target);
    }
    Ok(Some(new_node))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::{GrowthPolicy, ModelConfig};

    fn params(n: u32, m: u32, rho: f64, gam: f64, growth: GrowthPolicy) -> ModelParams {
        let model = ModelConfig {
            initial_nodes: n,
            edges_per_new_node: m,
            gamma: 2.0,
            rho,
            gam,
        };
        ModelParams::new(&model, 100, growth).unwrap()
    }

    fn seeded(params: &ModelParams, seed: u64) -> (NetworkState, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let state = NetworkState::complete(params.initial_nodes(), &params.power_law(), &mut rng);
        (state, rng)
    }

    fn set_all(state: &mut NetworkState, propensity: f64) {
        for node in state.node_ids().collect::<Vec<_>>() {
            state.set_propensity(node, propensity).unwrap();
        }
    }

    fn assert_snapshot_within_aggregate(state: &NetworkState, outcome: &StepOutcome) {
        for tie in outcome.snapshot.ties() {
            assert!(state.has_tie(tie.low(), tie.high()), "snapshot tie {tie} missing");
        }
        for (index, list) in outcome.snapshot.lists().iter().enumerate() {
            let node = NodeId::from_index(index).unwrap();
            for &other in list {
                assert!(outcome.snapshot.contains_tie(other, node), "asymmetric snapshot");
            }
        }
    }

    #[test]
    fn explore_probability_formula() {
        let p = explore_probability(4, 1.0, 0.5, 0).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
        let p = explore_probability(4, 1.0, 0.5, 3).unwrap();
        assert!((p - 0.125).abs() < 1e-12);
        let p = explore_probability(9, 2.0, 0.0, 1).unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn isolated_nodes_always_explore() {
        assert!(explore_probability(0, 1.0, 2.0, 0).is_none());
    }

    #[test]
    fn propensity_above_one_is_always_active() {
        let params = params(4, 1, 1.0, 0.5, GrowthPolicy::Unbounded);
        let (mut state, mut rng) = seeded(&params, 1);
        let pinned = NodeId::new(2);
        for step in 0..50 {
            state.set_propensity(pinned, 1.0 + f64::EPSILON).unwrap();
            let outcome = run_step(&mut state, &params, step, &mut rng).unwrap();
            assert!(outcome.active.contains(pinned), "inactive at step {step}");
            assert!(state.propensity(pinned).unwrap() <= 1.0, "propensity not renewed");
        }
    }

    #[test]
    fn zero_propensity_is_never_active() {
        let params = params(4, 1, 1.0, 0.5, GrowthPolicy::Capped(5));
        let (mut state, mut rng) = seeded(&params, 2);
        for step in 0..20 {
            set_all(&mut state, 0.0);
            let outcome = run_step(&mut state, &params, step, &mut rng).unwrap();
            assert!(outcome.active.is_empty());
            assert!(outcome.explorers.is_empty());
        }
    }

    #[test]
    fn inactive_nodes_keep_their_propensity() {
        let params = params(3, 1, 1.0, 0.5, GrowthPolicy::Capped(4));
        let (mut state, mut rng) = seeded(&params, 3);
        set_all(&mut state, 0.0);
        run_step(&mut state, &params, 0, &mut rng).unwrap();
        for node in 0..3 {
            assert!(state.propensity(NodeId::new(node)).unwrap().abs() < f64::EPSILON);
        }
    }

    #[test]
    fn all_reinforcers_confirm_whole_seed() {
        // rho = 0: nobody explores, every active node reinforces.
        let params = params(4, 1, 0.0, 0.0, GrowthPolicy::Unbounded);
        let (mut state, mut rng) = seeded(&params, 4);
        set_all(&mut state, 2.0);
        let outcome = run_step(&mut state, &params, 0, &mut rng).unwrap();

        assert_eq!(outcome.active.len(), 4);
        assert!(outcome.explorers.is_empty());
        assert_eq!(outcome.reinforcers, 4);
        assert_eq!(outcome.new_node, Some(NodeId::new(4)));
        assert_eq!(outcome.snapshot.node_count(), 5);
        // 6 seed ties reconfirmed plus the single growth tie.
        assert_eq!(outcome.snapshot.tie_count(), 7);
        assert_eq!(outcome.new_ties(), 1);
        assert_snapshot_within_aggregate(&state, &outcome);
    }

    #[test]
    fn reinforcement_only_links_active_pairs() {
        let params = params(4, 1, 0.0, 0.0, GrowthPolicy::Capped(5));
        let (mut state, mut rng) = seeded(&params, 5);
        // Grow to the cap so later steps have no growth ties.
        set_all(&mut state, 0.0);
        run_step(&mut state, &params, 0, &mut rng).unwrap();

        set_all(&mut state, 0.0);
        state.set_propensity(NodeId::new(0), 2.0).unwrap();
        state.set_propensity(NodeId::new(1), 2.0).unwrap();
        let outcome = run_step(&mut state, &params, 1, &mut rng).unwrap();

        assert_eq!(outcome.active.as_slice(), &[NodeId::new(0), NodeId::new(1)]);
        assert!(outcome.new_node.is_none());
        assert_eq!(outcome.snapshot.tie_count(), 1);
        assert!(outcome.snapshot.contains_tie(NodeId::new(0), NodeId::new(1)));
    }

    #[test]
    fn saturated_explorers_are_skipped() {
        // Huge rho: every active node explores, but the seed is complete.
        let params = params(4, 2, 1e9, 0.0, GrowthPolicy::Capped(5));
        let (mut state, mut rng) = seeded(&params, 6);
        set_all(&mut state, 2.0);
        let outcome = run_step(&mut state, &params, 0, &mut rng).unwrap();

        assert_eq!(outcome.explorers.len(), 4);
        assert_eq!(outcome.explored_ties, 0);
        assert_eq!(outcome.new_node, Some(NodeId::new(4)));
        assert_eq!(outcome.snapshot.tie_count(), 2);
        assert_eq!(state.edge_count(), 8);
    }

    #[test]
    fn explorers_never_duplicate_ties() {
        let params = params(4, 1, 1e9, 0.0, GrowthPolicy::Capped(12));
        let (mut state, mut rng) = seeded(&params, 7);
        // Grow quietly first so there is room to explore.
        for step in 0..8 {
            set_all(&mut state, 0.0);
            run_step(&mut state, &params, step, &mut rng).unwrap();
        }
        assert_eq!(state.node_count(), 12);

        for step in 8..40 {
            set_all(&mut state, 2.0);
            let edges_before = state.edge_count();
            let outcome = run_step(&mut state, &params, step, &mut rng).unwrap();
            assert!(state.is_consistent());
            assert_eq!(state.edge_count(), edges_before + outcome.explored_ties);
            assert_snapshot_within_aggregate(&state, &outcome);
        }
    }

    /// A network with `nodes` isolated nodes plus the given ties.
    fn network(nodes: u32, ties: &[(u32, u32)]) -> NetworkState {
        let mut rng = SmallRng::seed_from_u64(0);
        let law = sampler::PowerLaw::new(2.0).unwrap();
        let mut state = NetworkState::new();
        for _ in 0..nodes {
            state.add_node(&[], &law, &mut rng).unwrap();
        }
        for &(a, b) in ties {
            state.add_tie(NodeId::new(a), NodeId::new(b)).unwrap();
        }
        state
    }

    #[test]
    fn exploration_weights_ignore_ties_formed_this_step() {
        // At step start only node 3 carries weight. Once explorer 0 ties to
        // it, node 0 has live degree 1, but explorer 1 must still choose 3.
        let step_start = [0, 0, 0, 1];
        for seed in 0..30 {
            let mut state = network(4, &[]);
            let mut snapshot = SnapshotBuilder::new(4);
            let mut rng = SmallRng::seed_from_u64(seed);
            let explorers = [NodeId::new(0), NodeId::new(1)];
            let formed =
                phase_exploration(&mut state, &explorers, &step_start, &mut snapshot, &mut rng)
                    .unwrap();
            assert_eq!(formed, 2);
            assert!(state.has_tie(NodeId::new(0), NodeId::new(3)));
            assert!(state.has_tie(NodeId::new(1), NodeId::new(3)));
            assert!(!state.has_tie(NodeId::new(1), NodeId::new(0)));
        }
    }

    #[test]
    fn growth_weights_ignore_ties_formed_this_step() {
        let params = params(2, 1, 1.0, 0.5, GrowthPolicy::Unbounded);
        let step_start = [0, 0, 0, 1];
        for seed in 0..30 {
            // Live degrees after exploration favour nodes 0 and 1.
            let mut state = network(4, &[(0, 1), (0, 2), (1, 2), (0, 3)]);
            let mut snapshot = SnapshotBuilder::new(4);
            let mut rng = SmallRng::seed_from_u64(seed);
            let new_node =
                phase_growth(&mut state, &params, &step_start, &mut snapshot, &mut rng)
                    .unwrap()
                    .unwrap();
            assert_eq!(new_node, NodeId::new(4));
            let neighbors = state.neighbors(new_node).unwrap();
            assert!(neighbors.iter().eq([NodeId::new(3)].iter()));
            assert!(snapshot.finish().contains_tie(new_node, NodeId::new(3)));
        }
    }

    #[test]
    fn reinforcer_confirms_tie_to_active_explorer() {
        // Degree 1 explores, degree 3 reinforces: 1e9 * 3^-100 is negligible.
        let params = params(2, 1, 1e9, 100.0, GrowthPolicy::Capped(3));
        for seed in 0..20 {
            let mut state = network(4, &[(0, 1), (1, 2), (1, 3)]);
            set_all(&mut state, 0.0);
            state.set_propensity(NodeId::new(0), 2.0).unwrap();
            state.set_propensity(NodeId::new(1), 2.0).unwrap();
            let mut rng = SmallRng::seed_from_u64(seed);
            let outcome = run_step(&mut state, &params, 0, &mut rng).unwrap();

            assert_eq!(outcome.explorers, vec![NodeId::new(0)]);
            assert_eq!(outcome.reinforcers, 1);
            assert_eq!(outcome.explored_ties, 1);
            assert!(outcome.new_node.is_none());
            assert!(outcome.snapshot.contains_tie(NodeId::new(0), NodeId::new(1)));
            // The explored tie plus the reinforced one; inactive 2 and 3 stay out.
            assert_eq!(outcome.snapshot.tie_count(), 2);
        }
    }

    #[test]
    fn reinforcement_reads_ties_formed_this_step() {
        let mut state = network(3, &[(1, 2)]);
        // Exploration already tied 0 to 1 in this step.
        state.add_tie(NodeId::new(0), NodeId::new(1)).unwrap();
        let mut snapshot = SnapshotBuilder::new(3);
        let active = [NodeId::new(0), NodeId::new(1)];
        phase_reinforcement(&state, &active, &[NodeId::new(1)], &mut snapshot).unwrap();
        let record = snapshot.finish();
        assert!(record.contains_tie(NodeId::new(0), NodeId::new(1)));
        assert_eq!(record.tie_count(), 1);
    }

    #[test]
    fn growth_adds_m_distinct_ties() {
        let params = params(5, 3, 1.0, 0.5, GrowthPolicy::Unbounded);
        let (mut state, mut rng) = seeded(&params, 8);
        set_all(&mut state, 0.0);
        let outcome = run_step(&mut state, &params, 0, &mut rng).unwrap();
        let new_node = outcome.new_node.unwrap();
        assert_eq!(new_node, NodeId::new(5));
        assert_eq!(state.degree(new_node).unwrap(), 3);
        assert_eq!(outcome.snapshot.neighbors(new_node).len(), 3);
        assert_eq!(outcome.new_ties(), 3);
    }

    #[test]
    fn growth_stops_at_cap() {
        let params = params(3, 1, 1.0, 0.5, GrowthPolicy::Capped(5));
        let (mut state, mut rng) = seeded(&params, 9);
        let mut counts = Vec::new();
        for step in 0..6 {
            run_step(&mut state, &params, step, &mut rng).unwrap();
            counts.push(state.node_count());
        }
        assert_eq!(counts, vec![4, 5, 5, 5, 5, 5]);
    }

    #[test]
    fn long_run_keeps_invariants() {
        let params = params(3, 2, 1.0, 0.5, GrowthPolicy::Unbounded);
        let (mut state, mut rng) = seeded(&params, 10);
        let mut edges = state.edge_count();
        for step in 0..200 {
            let outcome = run_step(&mut state, &params, step, &mut rng).unwrap();
            assert!(state.is_consistent());
            assert!(state.edge_count() >= edges + 2);
            edges = state.edge_count();
            assert_snapshot_within_aggregate(&state, &outcome);
            assert_eq!(outcome.snapshot.node_count(), state.node_count());
        }
        assert_eq!(state.node_count(), 203);
    }

    #[test]
    fn same_seed_same_outcomes() {
        let params = params(4, 2, 1.0, 0.5, GrowthPolicy::Unbounded);
        let (mut a, mut rng_a) = seeded(&params, 11);
        let (mut b, mut rng_b) = seeded(&params, 11);
        for step in 0..30 {
            let out_a = run_step(&mut a, &params, step, &mut rng_a).unwrap();
            let out_b = run_step(&mut b, &params, step, &mut rng_b).unwrap();
            assert_eq!(out_a, out_b);
        }
        assert_eq!(a, b);
    }
}
