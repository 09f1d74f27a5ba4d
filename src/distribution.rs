//! Predictive distributions attached to forecast rows.
//!
//! A forecast is a full distribution rather than a point value. Normal
//! forecasts are kept in closed form; forecasts without an analytic form
//! carry simulated draws and answer quantile queries empirically.
//!
//! # Example
//! ```
//! use fable_forecast::distribution::Distribution;
//!
//! let d = Distribution::normal(10.0, 2.0).unwrap();
//! let hilo = d.hilo(&[80.0, 95.0]).unwrap();
//! assert!(hilo[0].lower > hilo[1].lower);
//! assert!(hilo[0].upper < hilo[1].upper);
//! ```

use crate::error::{FableError, Result};
use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal as StatrsNormal};
use std::fmt;

/// A forecast distribution for one time point.
///
/// Deserialisation goes through the validating constructors, so sample
/// draws arrive sorted and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDistribution")]
pub enum Distribution {
    /// Gaussian with the given mean and standard deviation.
    Normal { mean: f64, sd: f64 },
    /// Empirical distribution of simulated draws, sorted ascending.
    Sample(Vec<f64>),
    /// All mass at a single value.
    Degenerate(f64),
}

/// Unvalidated wire form of [`Distribution`].
#[derive(Deserialize)]
enum RawDistribution {
    Normal { mean: f64, sd: f64 },
    Sample(Vec<f64>),
    Degenerate(f64),
}

impl TryFrom<RawDistribution> for Distribution {
    type Error = FableError;

    fn try_from(raw: RawDistribution) -> Result<Self> {
        match raw {
            RawDistribution::Normal { mean, sd } => Distribution::normal(mean, sd),
            RawDistribution::Sample(draws) => Distribution::sample(draws),
            RawDistribution::Degenerate(value) => Ok(Distribution::degenerate(value)),
        }
    }
}

/// A two-sided interval at a stated confidence level (in percent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hilo {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl Hilo {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl fmt::Display for Hilo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}]{}", self.lower, self.upper, self.level)
    }
}

impl Distribution {
    /// Normal distribution; `sd` must be finite and non-negative.
    pub fn normal(mean: f64, sd: f64) -> Result<Self> {
        if !mean.is_finite() || !sd.is_finite() || sd < 0.0 {
            return Err(FableError::InvalidParameter(format!(
                "normal distribution needs a finite mean and sd >= 0, got N({}, {})",
                mean, sd
            )));
        }
        Ok(Distribution::Normal { mean, sd })
    }

    /// Empirical distribution from draws; NaN draws are discarded.
    pub fn sample(mut draws: Vec<f64>) -> Result<Self> {
        draws.retain(|x| !x.is_nan());
        if draws.is_empty() {
            return Err(FableError::InvalidParameter(
                "sample distribution needs at least one finite draw".to_string(),
            ));
        }
        draws.sort_by(f64::total_cmp);
        Ok(Distribution::Sample(draws))
    }

    pub fn degenerate(value: f64) -> Self {
        Distribution::Degenerate(value)
    }

    pub fn family(&self) -> &'static str {
        match self {
            Distribution::Normal { .. } => "normal",
            Distribution::Sample(_) => "sample",
            Distribution::Degenerate(_) => "degenerate",
        }
    }

    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Normal { mean, .. } => *mean,
            Distribution::Sample(draws) => draws.iter().sum::<f64>() / draws.len() as f64,
            Distribution::Degenerate(value) => *value,
        }
    }

    pub fn variance(&self) -> f64 {
        match self {
            Distribution::Normal { sd, .. } => sd * sd,
            Distribution::Sample(draws) if draws.len() > 1 => {
                let m = self.mean();
                draws.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (draws.len() - 1) as f64
            }
            Distribution::Sample(_) | Distribution::Degenerate(_) => 0.0,
        }
    }

    pub fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// Quantile at probability `p` in [0, 1]; NaN outside that range.
    ///
    /// Sample distributions interpolate linearly between order statistics.
    pub fn quantile(&self, p: f64) -> f64 {
        if !(0.0..=1.0).contains(&p) {
            return f64::NAN;
        }
        match self {
            Distribution::Normal { mean, sd } => {
                if *sd == 0.0 {
                    return *mean;
                }
                match StatrsNormal::new(*mean, *sd) {
                    Ok(normal) => normal.inverse_cdf(p),
                    Err(_) => f64::NAN,
                }
            }
            Distribution::Sample(draws) if draws.is_empty() => f64::NAN,
            Distribution::Sample(draws) => {
                let pos = p * (draws.len() - 1) as f64;
                let lo = pos.floor() as usize;
                let hi = pos.ceil() as usize;
                let frac = pos - lo as f64;
                draws[lo] + frac * (draws[hi] - draws[lo])
            }
            Distribution::Degenerate(value) => *value,
        }
    }

    /// Symmetric central interval covering `level` percent of the mass.
    pub fn interval(&self, level: f64) -> Result<Hilo> {
        if !(level > 0.0 && level < 100.0) {
            return Err(FableError::InvalidParameter(format!(
                "interval level must lie in (0, 100), got {}",
                level
            )));
        }
        let tail = (100.0 - level) / 200.0;
        Ok(Hilo {
            lower: self.quantile(tail),
            upper: self.quantile(1.0 - tail),
            level,
        })
    }

    /// One interval per requested level, in the order requested.
    pub fn hilo(&self, levels: &[f64]) -> Result<Vec<Hilo>> {
        levels.iter().map(|&level| self.interval(level)).collect()
    }

    /// Draw `n` values.
    pub fn draw<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        match self {
            Distribution::Normal { mean, sd } => match rand_distr::Normal::new(*mean, *sd) {
                Ok(normal) => (0..n).map(|_| normal.sample(rng)).collect(),
                Err(_) => vec![*mean; n],
            },
            Distribution::Sample(draws) if draws.is_empty() => vec![f64::NAN; n],
            Distribution::Sample(draws) => (0..n)
                .map(|_| draws[rng.gen_range(0..draws.len())])
                .collect(),
            Distribution::Degenerate(value) => vec![*value; n],
        }
    }

    /// Distribution of the sum of independent random variables.
    ///
    /// Normal and degenerate parts combine in closed form. Sample parts are
    /// added draw-wise and must share the same number of draws; degenerate
    /// parts shift them. Normal parts cannot be mixed with sample parts.
    pub fn sum_independent(parts: &[Distribution]) -> Result<Distribution> {
        if parts.is_empty() {
            return Err(FableError::EmptyData);
        }
        let samples: Vec<&Vec<f64>> = parts
            .iter()
            .filter_map(|d| match d {
                Distribution::Sample(draws) => Some(draws),
                _ => None,
            })
            .collect();

        if samples.is_empty() {
            let mean = parts.iter().map(Distribution::mean).sum::<f64>();
            let variance = parts.iter().map(Distribution::variance).sum::<f64>();
            if parts.iter().all(|d| matches!(d, Distribution::Degenerate(_))) {
                return Ok(Distribution::Degenerate(mean));
            }
            return Distribution::normal(mean, variance.sqrt());
        }

        if parts.iter().any(|d| matches!(d, Distribution::Normal { .. })) {
            return Err(FableError::InvalidParameter(
                "cannot add a normal distribution to a sample distribution".to_string(),
            ));
        }
        let n = samples[0].len();
        if let Some(other) = samples.iter().find(|s| s.len() != n) {
            return Err(FableError::DimensionMismatch {
                expected: n,
                got: other.len(),
            });
        }
        let shift: f64 = parts
            .iter()
            .filter_map(|d| match d {
                Distribution::Degenerate(v) => Some(*v),
                _ => None,
            })
            .sum();
        let draws = (0..n)
            .map(|i| shift + samples.iter().map(|s| s[i]).sum::<f64>())
            .collect();
        Distribution::sample(draws)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Normal { mean, sd } => write!(f, "N({:.4}, {:.4})", mean, sd * sd),
            Distribution::Sample(draws) => write!(f, "sample[{}]", draws.len()),
            Distribution::Degenerate(v) => write!(f, "{:.4}", v),
        }
    }
}
