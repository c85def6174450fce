//! On-disk round trips: run a simulation into an [`ActivityLog`] under a
//! temporary directory, then replay it.
//!
//! [`ActivityLog`]: tempnet_log::ActivityLog

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss
)]

use std::fs;
use std::path::Path;

use tempnet_core::config::{GrowthPolicy, ModelConfig, ModelParams};
use tempnet_core::runner::{MemorySink, RunControl, RunOutcome, run_simulation};
use tempnet_log::stats::{DistributionSummary, activity_counts, ccdf};
use tempnet_log::{ActivityHistory, ActivityLog, LogFiles, read_summary, write_summary};
use tempnet_types::NodeId;

fn params(n: u32, m: u32, steps: u64, growth: GrowthPolicy) -> ModelParams {
    let model = ModelConfig {
        initial_nodes: n,
        edges_per_new_node: m,
        gamma: 2.0,
        rho: 1.0,
        gam: 0.0,
    };
    ModelParams::new(&model, steps, growth).unwrap()
}

fn run_to_disk(dir: &Path, params: ModelParams, seed: u64) -> RunOutcome {
    let files = LogFiles::default();
    let mut log = ActivityLog::create(dir, &files).unwrap();
    let outcome = run_simulation(params, seed, &mut log, &RunControl::new()).unwrap();
    write_summary(&files.summary_path(dir), &outcome.summary).unwrap();
    outcome
}

#[test]
fn zero_step_run_writes_only_the_seed() {
    let dir = tempfile::tempdir().unwrap();
    run_to_disk(dir.path(), params(4, 1, 0, GrowthPolicy::Unbounded), 1);

    let files = LogFiles::default();
    let snapshots = fs::read_to_string(files.snapshot_path(dir.path())).unwrap();
    let active = fs::read_to_string(files.active_path(dir.path())).unwrap();
    assert_eq!(snapshots, "[[1,2,3],[0,2,3],[0,1,3],[0,1,2]]\n");
    assert!(active.is_empty());

    let history = ActivityHistory::load(dir.path(), &files).unwrap();
    assert_eq!(history.steps(), 0);
    assert_eq!(history.aggregate().edge_count(), 6);
}

#[test]
fn replayed_aggregate_matches_final_network() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_to_disk(dir.path(), params(4, 2, 60, GrowthPolicy::Capped(30)), 7);

    let history = ActivityHistory::load(dir.path(), &LogFiles::default()).unwrap();
    assert_eq!(history.steps(), 60);
    let aggregate = history.aggregate();
    assert_eq!(aggregate.node_count(), outcome.summary.node_count);
    assert_eq!(aggregate.edge_count(), outcome.summary.edge_count);
    assert_eq!(aggregate.degrees(), outcome.network.degrees());
}

#[test]
fn disk_log_matches_in_memory_records() {
    let dir = tempfile::tempdir().unwrap();
    let p = params(3, 1, 25, GrowthPolicy::Unbounded);
    run_to_disk(dir.path(), p, 13);

    let mut memory = MemorySink::default();
    run_simulation(p, 13, &mut memory, &RunControl::new()).unwrap();

    let history = ActivityHistory::load(dir.path(), &LogFiles::default()).unwrap();
    assert_eq!(history.snapshots(), memory.snapshots.as_slice());
    assert_eq!(history.active_sets(), memory.active.as_slice());
}

#[test]
fn same_seed_gives_byte_identical_logs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let p = params(5, 2, 80, GrowthPolicy::Unbounded);
    run_to_disk(a.path(), p, 2024);
    run_to_disk(b.path(), p, 2024);

    let files = LogFiles::default();
    for name in [&files.snapshot, &files.active, &files.summary] {
        let left = fs::read(a.path().join(name)).unwrap();
        let right = fs::read(b.path().join(name)).unwrap();
        assert_eq!(left, right, "{name} differs between identical runs");
    }
}

#[test]
fn replay_agrees_with_timelines() {
    let dir = tempfile::tempdir().unwrap();
    run_to_disk(dir.path(), params(4, 1, 30, GrowthPolicy::Unbounded), 5);
    let history = ActivityHistory::load(dir.path(), &LogFiles::default()).unwrap();

    let node = NodeId::new(0);
    for t in history.node_timeline(node) {
        assert!(history.node_active_at(node, t));
    }
    let counts = activity_counts(&history);
    assert_eq!(counts[0], history.node_timeline(node).len());
    assert_eq!(counts.len(), 34);

    // The seed tie (0, 1) is live at t = 0.
    assert_eq!(history.edge_timeline(NodeId::new(0), NodeId::new(1))[0], 0);
}

#[test]
fn adjacency_grows_monotonically_on_replay() {
    let dir = tempfile::tempdir().unwrap();
    run_to_disk(dir.path(), params(4, 2, 40, GrowthPolicy::Unbounded), 11);
    let history = ActivityHistory::load(dir.path(), &LogFiles::default()).unwrap();

    let mut previous = history.adjacency_at(0).unwrap();
    for t in 1..=history.steps() {
        let current = history.adjacency_at(t).unwrap();
        assert!(current.edge_count() >= previous.edge_count());
        assert!(previous.ties().all(|tie| current.has_edge(tie.low(), tie.high())));
        previous = current;
    }
}

#[test]
fn summary_round_trips_and_degree_ccdf_is_sane() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_to_disk(dir.path(), params(5, 2, 50, GrowthPolicy::Unbounded), 3);
    let files = LogFiles::default();
    let summary = read_summary(&files.summary_path(dir.path())).unwrap();
    assert_eq!(summary, outcome.summary);

    let degrees = outcome.network.degrees();
    let curve = ccdf(&degrees);
    assert!((curve[0].1 - 1.0).abs() < f64::EPSILON);
    assert!(curve.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 > w[1].1));

    let stats = DistributionSummary::of(&degrees).expect("non-empty network");
    assert!(stats.min >= 2);
    let mean_degree = 2.0 * summary.edge_count as f64 / summary.node_count as f64;
    assert!((stats.mean - mean_degree).abs() < 1e-9);
}

#[test]
fn corrupted_log_is_reported_with_line_number() {
    let dir = tempfile::tempdir().unwrap();
    run_to_disk(dir.path(), params(3, 1, 3, GrowthPolicy::Unbounded), 1);
    let files = LogFiles::default();
    let path = files.active_path(dir.path());
    let mut contents = fs::read_to_string(&path).unwrap();
    contents.push_str("[1,\n");
    fs::write(&path, contents).unwrap();

    let err = ActivityHistory::load(dir.path(), &files).unwrap_err();
    assert!(err.to_string().contains("line 4"), "unexpected error: {err}");
}

#[test]
fn crash_between_snapshot_and_active_line_keeps_complete_steps() {
    let dir = tempfile::tempdir().unwrap();
    let p = params(4, 1, 5, GrowthPolicy::Unbounded);
    run_to_disk(dir.path(), p, 21);

    // The last step reached the snapshot log but not the active-node log.
    let files = LogFiles::default();
    let path = files.active_path(dir.path());
    let contents = fs::read_to_string(&path).unwrap();
    let kept: String = contents.lines().take(4).map(|line| format!("{line}\n")).collect();
    fs::write(&path, kept).unwrap();

    let history = ActivityHistory::load(dir.path(), &files).unwrap();
    assert_eq!(history.steps(), 4);

    let mut memory = MemorySink::default();
    run_simulation(p, 21, &mut memory, &RunControl::new()).unwrap();
    assert_eq!(history.snapshots(), &memory.snapshots[..5]);
    assert_eq!(history.active_sets(), &memory.active[..4]);
    assert_eq!(history.aggregate().node_count(), 8);
}

#[test]
fn two_missing_active_lines_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    run_to_disk(dir.path(), params(4, 1, 5, GrowthPolicy::Unbounded), 22);

    let files = LogFiles::default();
    let path = files.active_path(dir.path());
    let contents = fs::read_to_string(&path).unwrap();
    let kept: String = contents.lines().take(3).map(|line| format!("{line}\n")).collect();
    fs::write(&path, kept).unwrap();

    let err = ActivityHistory::load(dir.path(), &files).unwrap_err();
    assert!(err.to_string().contains("6 lines"), "unexpected error: {err}");
}
