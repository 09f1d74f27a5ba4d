//! Options for forecasting, refitting and table fitting.

use serde::{Deserialize, Serialize};

/// Options controlling forecast distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastOptions {
    /// Number of sample paths when a distribution has no closed form or
    /// `bootstrap` is set.
    pub times: usize,
    /// Seed for sample paths. `None` draws a fresh seed from entropy.
    pub seed: Option<u64>,
    /// Resample residuals instead of drawing Gaussian innovations.
    pub bootstrap: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            times: 1000,
            seed: None,
            bootstrap: false,
        }
    }
}

impl ForecastOptions {
    pub fn with_times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }
}

/// Options for refitting a model to new data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefitOptions {
    /// Re-estimate parameters. When false, the fitted parameters are kept
    /// and only the state is re-filtered over the new data.
    pub reestimate: bool,
}

impl RefitOptions {
    pub fn reestimate() -> Self {
        Self { reestimate: true }
    }
}

/// Options for fitting a model table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MableConfig {
    /// Fit cells on the rayon thread pool.
    pub parallel: bool,
}

impl Default for MableConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl MableConfig {
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
