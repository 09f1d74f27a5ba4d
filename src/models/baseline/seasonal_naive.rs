//! Seasonal naive forecast: the value observed one season earlier.

use super::{check_interval, continue_series, residual_variance};
use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::{FableError, Result};
use crate::models::traits::{draw_innovation, residual_pool, Coefficient, Glance, ModelFit};
use crate::spec::{ModelFamily, ModelSpec, SeasonalNaiveSpec};
use rand::rngs::StdRng;

/// A fitted seasonal naive model.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalNaiveFit {
    spec: SeasonalNaiveSpec,
    period: usize,
    series: TimeSeries,
    sigma2: f64,
    fitted: Vec<f64>,
}

fn seasonal_fitted(values: &[f64], period: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t < period { f64::NAN } else { values[t - period] })
        .collect()
}

/// Most recent observed value in the same season as position `t`, and the
/// number of seasons stepped back to reach it.
fn same_season(values: &[f64], t: usize, period: usize) -> Option<(f64, usize)> {
    (1..=t / period)
        .map(|k| (k, t - k * period))
        .filter(|(_, i)| *i < values.len())
        .find_map(|(k, i)| (!values[i].is_nan()).then(|| (values[i], k)))
}

/// Fit a seasonal naive model.
///
/// # Errors
///
/// [`FableError::InvalidSpec`] when the period is not greater than one and
/// [`FableError::InsufficientData`] when no observation has an observed
/// counterpart one season earlier.
pub fn fit_seasonal_naive(series: &TimeSeries, spec: &SeasonalNaiveSpec) -> Result<SeasonalNaiveFit> {
    spec.validate()?;
    let period = spec.period.or(series.seasonal_period());
    if period <= 1 {
        return Err(FableError::InvalidSpec(format!(
            "SNAIVE needs a seasonal period greater than one, got {}",
            period
        )));
    }
    let fitted = seasonal_fitted(series.values(), period);
    let sigma2 = residual_variance(series.values(), &fitted, 0).ok_or(
        FableError::InsufficientData {
            needed: period + 1,
            got: series.len(),
        },
    )?;
    Ok(SeasonalNaiveFit {
        spec: *spec,
        period,
        series: series.clone(),
        sigma2,
        fitted,
    })
}

impl SeasonalNaiveFit {
    pub fn period(&self) -> usize {
        self.period
    }
}

impl ModelFit for SeasonalNaiveFit {
    fn family(&self) -> ModelFamily {
        ModelFamily::SeasonalNaive
    }

    fn label(&self) -> String {
        "SNAIVE".to_string()
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec::SeasonalNaive(self.spec)
    }

    fn series(&self) -> &TimeSeries {
        &self.series
    }

    fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn glance(&self) -> Glance {
        Glance::without_likelihood(self.sigma2, self.series.observed_count(), 0)
    }

    fn coefficients(&self) -> Vec<Coefficient> {
        Vec::new()
    }

    /// Variance grows by `sigma2` per full season stepped back.
    fn forecast(&self, h: usize, _options: &ForecastOptions) -> Result<Vec<Distribution>> {
        let values = self.series.values();
        let n = values.len();
        (0..h)
            .map(|j| {
                let target = n + j;
                let (value, seasons) = same_season(values, target, self.period).ok_or_else(|| {
                    FableError::ComputationError(format!(
                        "no observed value in the season of step {}",
                        j + 1
                    ))
                })?;
                Distribution::normal(value, (self.sigma2 * seasons as f64).sqrt())
            })
            .collect()
    }

    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>> {
        let pool = residual_pool(&self.residuals());
        let mut path = self.series.values().to_vec();
        let n = path.len();
        for j in 0..h {
            let (base, _) = same_season(&path, n + j, self.period).ok_or_else(|| {
                FableError::ComputationError(format!(
                    "no observed value in the season of step {}",
                    j + 1
                ))
            })?;
            path.push(base + draw_innovation(rng, self.sigma2, &pool, bootstrap));
        }
        Ok(path.split_off(n))
    }

    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        check_interval(&self.series, series)?;
        if options.reestimate {
            return fit_seasonal_naive(series, &self.spec)
                .map_err(|e| FableError::Refit(e.to_string()));
        }
        Ok(Self {
            series: series.clone(),
            fitted: seasonal_fitted(series.values(), self.period),
            ..self.clone()
        })
    }

    fn stream(mut self, new_data: &TimeSeries) -> Result<Self> {
        if new_data.is_empty() {
            return Ok(self);
        }
        self.series = continue_series(&self.series, new_data)?;
        self.fitted = seasonal_fitted(self.series.values(), self.period);
        Ok(self)
    }
}
