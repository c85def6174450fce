//! Run driver: seeds the network, loops the evolution step, and hands every
//! record to an [`ActivitySink`].
//!
//! A run proceeds as:
//!
//! ```text
//! seed complete graph + propensities
//!   |
//!   +-- sink.record_seed(adjacency)           record 0
//!   +-- for step in 0..N:
//!   |     check stop flag
//!   |     run_step()
//!   |     sink.record_step(outcome)           must succeed before next step
//!   +-- sink.finish()
//! ```
//!
//! The random stream is a [`StdRng`] owned by the [`Simulation`] and seeded
//! explicitly, so a run is reproducible from `(params, seed)`.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempnet_types::{ActiveRecord, RunSummary, SnapshotRecord};
use tracing::info;

use crate::config::ModelParams;
use crate::evolution::{self, StepError, StepOutcome};
use crate::network::NetworkState;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step violated an engine invariant.
    #[error("step {step} failed: {source}")]
    Step {
        /// Zero-based index of the failing step.
        step: u64,
        /// The underlying step error.
        source: StepError,
    },

    /// The sink could not persist a record.
    #[error("failed to record {record}: {source}")]
    Sink {
        /// Which record was being written.
        record: RecordKind,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Identifies the record a sink failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// The seed adjacency.
    Seed,
    /// The records of one step.
    Step(u64),
    /// The final flush.
    Finish,
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Seed => write!(f, "seed adjacency"),
            Self::Step(step) => write!(f, "step {step}"),
            Self::Finish => write!(f, "final flush"),
        }
    }
}

/// Destination for the per-step records of a run.
///
/// A sink call must either complete or fail; the driver does not start the
/// next step until the previous step's records were accepted.
pub trait ActivitySink {
    /// Called once, before the first step, with the seed adjacency.
    fn record_seed(&mut self, seed: &SnapshotRecord) -> io::Result<()>;

    /// Called after each step with everything the step produced.
    fn record_step(&mut self, outcome: &StepOutcome) -> io::Result<()>;

    /// Called once after the last step.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ActivitySink for NullSink {
    fn record_seed(&mut self, _seed: &SnapshotRecord) -> io::Result<()> {
        Ok(())
    }

    fn record_step(&mut self, _outcome: &StepOutcome) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that keeps every record in memory.
///
/// `snapshots[0]` is the seed adjacency and `snapshots[t]` the snapshot of
/// step `t - 1`; `active[s]` is the active set of step `s`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    /// Seed adjacency followed by one snapshot per step.
    pub snapshots: Vec<SnapshotRecord>,
    /// One active set per step.
    pub active: Vec<ActiveRecord>,
}

impl ActivitySink for MemorySink {
    fn record_seed(&mut self, seed: &SnapshotRecord) -> io::Result<()> {
        self.snapshots.push(seed.clone());
        Ok(())
    }

    fn record_step(&mut self, outcome: &StepOutcome) -> io::Result<()> {
        self.snapshots.push(outcome.snapshot.clone());
        self.active.push(outcome.active.clone());
        Ok(())
    }
}

impl<S: ActivitySink + ?Sized> ActivitySink for &mut S {
    fn record_seed(&mut self, seed: &SnapshotRecord) -> io::Result<()> {
        (**self).record_seed(seed)
    }

    fn record_step(&mut self, outcome: &StepOutcome) -> io::Result<()> {
        (**self).record_step(outcome)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Between-step control of a running simulation.
///
/// A stop request is honoured before the next step starts, never mid-step,
/// so the network and the sink are always consistent at a step boundary.
#[derive(Debug, Default)]
pub struct RunControl {
    stop_requested: AtomicBool,
}

impl RunControl {
    /// A control with no stop requested.
    pub const fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Request the run to stop before its next step.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Reason a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// All configured steps executed.
    Completed,
    /// A stop was requested through [`RunControl`].
    Stopped,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The final aggregate network.
    pub network: NetworkState,
    /// Summary statistics.
    pub summary: RunSummary,
    /// Why the run ended.
    pub end_reason: RunEndReason,
}

/// A seeded network plus the random stream that will evolve it.
#[derive(Debug, Clone)]
pub struct Simulation {
    params: ModelParams,
    seed: u64,
    rng: StdRng,
    network: NetworkState,
    steps_executed: u64,
}

impl Simulation {
    /// Seed the complete graph over `n` nodes and draw its propensities.
    pub fn new(params: ModelParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let network = NetworkState::complete(params.initial_nodes(), &params.power_law(), &mut rng);
        Self {
            params,
            seed,
            rng,
            network,
            steps_executed: 0,
        }
    }

    /// The validated parameters.
    pub const fn params(&self) -> &ModelParams {
        &self.params
    }

    /// The current aggregate network.
    pub const fn network(&self) -> &NetworkState {
        &self.network
    }

    /// Steps executed so far.
    pub const fn steps_executed(&self) -> u64 {
        self.steps_executed
    }

    /// Whether every configured step has run.
    pub const fn is_finished(&self) -> bool {
        self.steps_executed >= self.params.steps()
    }

    /// Execute the next step.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Step`] if the step violates an engine invariant.
    pub fn step(&mut self) -> Result<StepOutcome, RunnerError> {
        let step = self.steps_executed;
        let outcome = evolution::run_step(&mut self.network, &self.params, step, &mut self.rng)
            .map_err(|source| RunnerError::Step { step, source })?;
        self.steps_executed = self.steps_executed.saturating_add(1);
        Ok(outcome)
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            seed: self.seed,
            steps_requested: self.params.steps(),
            steps_executed: self.steps_executed,
            node_count: self.network.node_count(),
            edge_count: self.network.edge_count(),
        }
    }

    /// Run every remaining step, recording into `sink`.
    ///
    /// The seed adjacency is recorded first, so call this on a fresh
    /// simulation.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Step`] on an engine invariant violation and
    /// [`RunnerError::Sink`] if the sink fails; either ends the run.
    pub fn run(
        mut self,
        sink: &mut dyn ActivitySink,
        control: &RunControl,
    ) -> Result<RunOutcome, RunnerError> {
        info!(
            initial_nodes = self.params.initial_nodes(),
            edges_per_new_node = self.params.edges_per_new_node(),
            gamma = self.params.power_law().gamma(),
            rho = self.params.rho(),
            gam = self.params.gam(),
            steps = self.params.steps(),
            growth = ?self.params.growth(),
            seed = self.seed,
            "Simulation starting"
        );

        sink.record_seed(&self.network.adjacency())
            .map_err(|source| RunnerError::Sink {
                record: RecordKind::Seed,
                source,
            })?;

        let mut end_reason = RunEndReason::Completed;
        while !self.is_finished() {
            if control.is_stop_requested() {
                info!(step = self.steps_executed, "Stop requested");
                end_reason = RunEndReason::Stopped;
                break;
            }
            let outcome = self.step()?;
            sink.record_step(&outcome)
                .map_err(|source| RunnerError::Sink {
                    record: RecordKind::Step(outcome.step),
                    source,
                })?;
        }

        sink.finish().map_err(|source| RunnerError::Sink {
            record: RecordKind::Finish,
            source,
        })?;

        let summary = self.summary();
        Ok(RunOutcome {
            network: self.network,
            summary,
            end_reason,
        })
    }
}

/// Seed and run a simulation in one call.
///
/// # Errors
///
/// See [`Simulation::run`].
pub fn run_simulation(
    params: ModelParams,
    seed: u64,
    sink: &mut dyn ActivitySink,
    control: &RunControl,
) -> Result<RunOutcome, RunnerError> {
    Simulation::new(params, seed).run(sink, control)
}

/// Log the end of a run.
pub fn log_run_end(outcome: &RunOutcome) {
    info!(
        reason = ?outcome.end_reason,
        steps = outcome.summary.steps_executed,
        nodes = outcome.summary.node_count,
        edges = outcome.summary.edge_count,
        "Temporal network generated"
    );
}
