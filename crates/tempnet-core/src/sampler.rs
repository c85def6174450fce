//! Stochastic primitives: power-law propensity draws and cumulative-weight
//! preferential selection.
//!
//! Every function takes the random stream as an explicit `&mut impl Rng`
//! parameter. Nothing here touches a global or thread-local generator, so a
//! run driven by a seeded generator is fully reproducible.

use rand::Rng;

/// Errors raised by the sampling primitives.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The power-law exponent is not a finite number greater than 1.
    #[error("power-law exponent must be finite and greater than 1, got {gamma}")]
    InvalidExponent {
        /// The rejected exponent.
        gamma: f64,
    },

    /// A weight is negative, NaN, or infinite.
    #[error("weight at index {index} is not a finite non-negative number: {weight}")]
    InvalidWeight {
        /// Position of the offending weight.
        index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// The weights sum to zero (or the candidate set is empty).
    #[error("weighted choice over {candidates} candidates with zero total weight")]
    DegenerateWeights {
        /// Number of candidates offered.
        candidates: usize,
    },

    /// Fewer candidates carry weight than distinct draws were requested.
    #[error("requested {requested} distinct draws but only {available} candidates carry weight")]
    InsufficientSupport {
        /// Number of distinct draws requested.
        requested: usize,
        /// Number of candidates with positive weight.
        available: usize,
    },
}

/// Power-law distribution of activity propensities on (0, 1].
///
/// A draw is `U^(1/(gamma-1))` with `U` uniform on (0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    gamma: f64,
    inv_exponent: f64,
}

impl PowerLaw {
    /// Create the distribution for exponent `gamma`.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidExponent`] unless `gamma` is finite and
    /// greater than 1.
    pub fn new(gamma: f64) -> Result<Self, SamplerError> {
        if !gamma.is_finite() || gamma <= 1.0 {
            return Err(SamplerError::InvalidExponent { gamma });
        }
        Ok(Self {
            gamma,
            inv_exponent: (gamma - 1.0).recip(),
        })
    }

    /// The exponent this distribution was built with.
    pub const fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Draw one activity propensity.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        // `random` is uniform on [0, 1); flip it onto (0, 1] so a draw is
        // never exactly zero.
        let u = 1.0 - rng.random::<f64>();
        u.powf(self.inv_exponent)
    }
}

/// Prefix sums over a weight vector, ready for repeated O(log k) draws.
#[derive(Debug, Clone)]
pub struct CumulativeWeights {
    cumulative: Vec<f64>,
    total: f64,
}

impl CumulativeWeights {
    /// Build prefix sums over `weights`.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidWeight`] for a negative or non-finite
    /// weight, or [`SamplerError::DegenerateWeights`] when the weights sum to
    /// zero.
    pub fn new(weights: &[f64]) -> Result<Self, SamplerError> {
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0_f64;
        for (index, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(SamplerError::InvalidWeight { index, weight });
            }
            total += weight;
            cumulative.push(total);
        }
        if total <= 0.0 || !total.is_finite() {
            return Err(SamplerError::DegenerateWeights {
                candidates: weights.len(),
            });
        }
        Ok(Self { cumulative, total })
    }

    /// Sum of all weights.
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    /// Whether there are no candidates. Always false for a built instance.
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Draw an index with probability proportional to its weight.
    ///
    /// Returns the first index whose prefix sum exceeds a uniform draw on
    /// `[0, total)`; zero-weight indices are never returned.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let target = rng.random::<f64>() * self.total;
        let index = self.cumulative.partition_point(|&c| c <= target);
        if index < self.cumulative.len() {
            return index;
        }
        // Rounding pushed the target onto the total: fall back to the last
        // index that carries weight.
        self.last_weighted_index()
    }

    fn last_weighted_index(&self) -> usize {
        (0..self.cumulative.len())
            .rev()
            .find(|&index| {
                let here = self.cumulative.get(index).copied().unwrap_or(0.0);
                let below = index
                    .checked_sub(1)
                    .and_then(|i| self.cumulative.get(i))
                    .copied()
                    .unwrap_or(0.0);
                here > below
            })
            .unwrap_or(0)
    }
}

/// Draw one index with probability proportional to `weights[index]`.
///
/// # Errors
///
/// See [`CumulativeWeights::new`]. An all-zero or empty weight vector is a
/// broken precondition of the caller and is reported as
/// [`SamplerError::DegenerateWeights`].
pub fn weighted_index(weights: &[f64], rng: &mut impl Rng) -> Result<usize, SamplerError> {
    let table = CumulativeWeights::new(weights)?;
    Ok(table.sample(rng))
}

/// Draw `count` distinct indices, each with probability proportional to its
/// weight among the indices not yet chosen.
///
/// After each draw the chosen index's mass is zeroed and the remaining
/// distribution renormalised. Indices are returned in draw order.
///
/// # Errors
///
/// Returns [`SamplerError::InsufficientSupport`] when fewer than `count`
/// indices carry positive weight, or any error of
/// [`CumulativeWeights::new`].
pub fn weighted_distinct(
    weights: &[f64],
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SamplerError> {
    let available = weights.iter().filter(|&&w| w > 0.0).count();
    if available < count {
        return Err(SamplerError::InsufficientSupport {
            requested: count,
            available,
        });
    }

    let mut remaining = weights.to_vec();
    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count {
        let index = weighted_index(&remaining, rng)?;
        if let Some(weight) = remaining.get_mut(index) {
            *weight = 0.0;
        }
        chosen.push(index);
    }
    Ok(chosen)
}
