//! Distribution statistics over degree and activity sequences.

use std::collections::BTreeMap;

use crate::replay::ActivityHistory;

/// Complementary cumulative distribution of `values`.
///
/// Returns one `(value, P[X >= value])` point per distinct value, sorted by
/// value. The first point is always `(min, 1.0)`. Empty input gives an empty
/// curve.
#[allow(clippy::cast_precision_loss)]
pub fn ccdf(values: &[usize]) -> Vec<(usize, f64)> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &value in values {
        let count = counts.entry(value).or_insert(0);
        *count = count.saturating_add(1);
    }

    let total = values.len() as f64;
    let mut at_least = values.len();
    let mut curve = Vec::with_capacity(counts.len());
    for (value, count) in counts {
        curve.push((value, at_least as f64 / total));
        at_least = at_least.saturating_sub(count);
    }
    curve
}

/// Number of steps each node was active, indexed by id.
///
/// Covers every node of the final network, including those never active.
pub fn activity_counts(history: &ActivityHistory) -> Vec<usize> {
    let node_count = history
        .snapshots()
        .last()
        .map_or(0, tempnet_types::SnapshotRecord::node_count);
    let mut counts = vec![0_usize; node_count];
    for active in history.active_sets() {
        for node in active.iter() {
            if let Some(count) = counts.get_mut(node.index()) {
                *count = count.saturating_add(1);
            }
        }
    }
    counts
}

/// Minimum, maximum, and mean of a sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionSummary {
    /// Smallest value.
    pub min: usize,
    /// Largest value.
    pub max: usize,
    /// Arithmetic mean.
    pub mean: f64,
}

impl DistributionSummary {
    /// Summarise `values`, or `None` if empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn of(values: &[usize]) -> Option<Self> {
        let min = values.iter().copied().min()?;
        let max = values.iter().copied().max()?;
        let sum = values.iter().fold(0_u128, |acc, &v| acc.saturating_add(v as u128));
        let mean = sum as f64 / values.len() as f64;
        Some(Self { min, max, mean })
    }
}
