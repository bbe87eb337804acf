//! Sampling distributions, each owning the stream it draws from.

use rand::distributions::{Distribution, WeightedIndex};
use rand_distr::{Exp, Normal as NormalDistr};

use crate::{RandomStream, SimError, SimResult};

/// Exponential distribution parameterised by its mean.
#[derive(Debug, Clone)]
pub struct Exponential {
    mean: f64,
    dist: Exp<f64>,
    stream: RandomStream,
}

impl Exponential {
    /// Mean must be finite and strictly positive.
    pub fn new(mean: f64, stream: RandomStream) -> SimResult<Self> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SimError::InvalidDistribution(format!(
                "exponential '{}' needs a positive mean, got {mean}",
                stream.name()
            )));
        }
        let dist = Exp::new(1.0 / mean)
            .map_err(|e| SimError::InvalidDistribution(format!("{}: {e}", stream.name())))?;
        Ok(Self { mean, dist, stream })
    }

    /// Configured mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Draws one value.
    pub fn sample(&mut self) -> f64 {
        self.dist.sample(self.stream.rng())
    }
}

/// Normal distribution.
#[derive(Debug, Clone)]
pub struct Normal {
    dist: NormalDistr<f64>,
    stream: RandomStream,
}

impl Normal {
    /// Standard deviation must be finite and non-negative.
    pub fn new(mean: f64, std_dev: f64, stream: RandomStream) -> SimResult<Self> {
        if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
            return Err(SimError::InvalidDistribution(format!(
                "normal '{}' needs a finite mean and non-negative deviation, got ({mean}, {std_dev})",
                stream.name()
            )));
        }
        let dist = NormalDistr::new(mean, std_dev)
            .map_err(|e| SimError::InvalidDistribution(format!("{}: {e}", stream.name())))?;
        Ok(Self { dist, stream })
    }

    /// Draws one value.
    pub fn sample(&mut self) -> f64 {
        self.dist.sample(self.stream.rng())
    }
}

/// Weighted choice over a fixed list of values.
#[derive(Debug, Clone)]
pub struct DiscreteEmpirical<T> {
    values: Vec<T>,
    index: WeightedIndex<f64>,
    stream: RandomStream,
}

impl<T: Clone> DiscreteEmpirical<T> {
    /// `values` and `weights` must have the same non-zero length; weights must
    /// be non-negative with a positive sum.
    pub fn new(values: Vec<T>, weights: &[f64], stream: RandomStream) -> SimResult<Self> {
        if values.is_empty() || values.len() != weights.len() {
            return Err(SimError::InvalidDistribution(format!(
                "discrete '{}' has {} values but {} weights",
                stream.name(),
                values.len(),
                weights.len()
            )));
        }
        let index = WeightedIndex::new(weights)
            .map_err(|e| SimError::InvalidDistribution(format!("{}: {e}", stream.name())))?;
        Ok(Self {
            values,
            index,
            stream,
        })
    }

    /// Draws one value.
    pub fn sample(&mut self) -> T {
        let i = self.index.sample(self.stream.rng());
        self.values[i].clone()
    }
}

impl DiscreteEmpirical<i64> {
    /// Equal weight for every integer in `low..=high`.
    pub fn uniform_int(low: i64, high: i64, stream: RandomStream) -> SimResult<Self> {
        if high < low {
            return Err(SimError::InvalidDistribution(format!(
                "discrete '{}' has empty range {low}..={high}",
                stream.name()
            )));
        }
        let values: Vec<i64> = (low..=high).collect();
        let weights = vec![1.0; values.len()];
        Self::new(values, &weights, stream)
    }
}
