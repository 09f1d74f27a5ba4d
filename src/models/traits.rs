//! The capability set shared by every fitted model.

use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::Result;
use crate::spec::{ModelFamily, ModelSpec};
use crate::utils::stats::InformationCriteria;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;

/// One estimated parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
}

impl Coefficient {
    pub fn new(term: impl Into<String>, estimate: f64) -> Self {
        Self {
            term: term.into(),
            estimate,
        }
    }
}

/// One-row summary of a fitted model.
///
/// Likelihood-based entries are `None` for families without a likelihood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Glance {
    pub sigma2: f64,
    pub log_lik: Option<f64>,
    pub aic: Option<f64>,
    pub aicc: Option<f64>,
    pub bic: Option<f64>,
    /// Non-missing observations used in estimation.
    pub nobs: usize,
    /// Estimated parameters, including the innovation variance.
    pub n_params: usize,
}

impl Glance {
    pub(crate) fn with_likelihood(
        sigma2: f64,
        log_lik: f64,
        ic: InformationCriteria,
        nobs: usize,
        n_params: usize,
    ) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            sigma2,
            log_lik: finite(log_lik),
            aic: finite(ic.aic),
            aicc: finite(ic.aicc),
            bic: finite(ic.bic),
            nobs,
            n_params,
        }
    }

    pub(crate) fn without_likelihood(sigma2: f64, nobs: usize, n_params: usize) -> Self {
        Self {
            sigma2,
            log_lik: None,
            aic: None,
            aicc: None,
            bic: None,
            nobs,
            n_params,
        }
    }
}

/// Named columns aligned with the training index.
#[derive(Debug, Clone, PartialEq)]
pub struct Components {
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl Components {
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Operations every fitted model supports, whatever its family.
///
/// Implementations are immutable values: `refit` returns a new model and
/// `stream` consumes the model and returns its extension.
pub trait ModelFit: Sized {
    fn family(&self) -> ModelFamily;

    /// Descriptive label of the selected structure, e.g. `ETS(M,Ad,N)`.
    fn label(&self) -> String;

    /// The specification the model was fitted from.
    fn spec(&self) -> ModelSpec;

    /// Training data, including any streamed observations.
    fn series(&self) -> &TimeSeries;

    /// One-step-ahead in-sample predictions.
    fn fitted(&self) -> &[f64];

    /// Innovation variance used for forecast distributions.
    fn sigma2(&self) -> f64;

    fn glance(&self) -> Glance;

    fn coefficients(&self) -> Vec<Coefficient>;

    /// Distributions for the next `h` steps.
    fn forecast(&self, h: usize, options: &ForecastOptions) -> Result<Vec<Distribution>>;

    /// One simulated future path of length `h`. With `bootstrap`, innovations
    /// are resampled from the model's residuals instead of drawn as Gaussian.
    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>>;

    /// Re-estimate (or re-filter) the same structure on new data.
    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self>;

    /// Extend the state with observations continuing the training index.
    fn stream(self, new_data: &TimeSeries) -> Result<Self>;

    /// Response residuals `y - fitted`.
    fn residuals(&self) -> Vec<f64> {
        self.series()
            .values()
            .iter()
            .zip(self.fitted())
            .map(|(y, f)| y - f)
            .collect()
    }

    /// Per-observation decomposition. Families without latent states report
    /// the fitted values and the residuals.
    fn components(&self) -> Components {
        Components {
            timestamps: self.series().timestamps().to_vec(),
            columns: vec![
                ("fitted".to_string(), self.fitted().to_vec()),
                ("remainder".to_string(), self.residuals()),
            ],
        }
    }

    /// Training series with missing values replaced by one-step predictions.
    fn interpolate(&self) -> Result<TimeSeries> {
        let filled = self
            .series()
            .values()
            .iter()
            .zip(self.fitted())
            .map(|(y, f)| if y.is_nan() { *f } else { *y })
            .collect();
        self.series().with_values(filled)
    }

    /// `n_paths` simulated future paths of length `h`.
    fn generate(
        &self,
        h: usize,
        n_paths: usize,
        rng: &mut StdRng,
        bootstrap: bool,
    ) -> Result<Vec<Vec<f64>>> {
        (0..n_paths)
            .map(|_| self.simulate(h, rng, bootstrap))
            .collect()
    }
}

/// Random source for sample-path forecasts.
pub(crate) fn forecast_rng(options: &ForecastOptions) -> StdRng {
    use rand::SeedableRng;

    match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Residual pool used for bootstrapped innovations.
pub(crate) fn residual_pool(residuals: &[f64]) -> Vec<f64> {
    residuals.iter().copied().filter(|r| r.is_finite()).collect()
}

/// Draw one innovation: Gaussian with variance `sigma2`, or a residual
/// resampled from `pool` when bootstrapping.
pub(crate) fn draw_innovation(
    rng: &mut StdRng,
    sigma2: f64,
    pool: &[f64],
    bootstrap: bool,
) -> f64 {
    use rand::Rng;
    use rand_distr::{Distribution as _, StandardNormal};

    if bootstrap && !pool.is_empty() {
        pool[rng.gen_range(0..pool.len())]
    } else {
        let z: f64 = StandardNormal.sample(rng);
        z * sigma2.max(0.0).sqrt()
    }
}

/// Summarise simulated paths into per-step sample distributions.
pub(crate) fn paths_to_distributions(paths: &[Vec<f64>], h: usize) -> Result<Vec<Distribution>> {
    (0..h)
        .map(|step| Distribution::sample(paths.iter().map(|p| p[step]).collect()))
        .collect()
}
