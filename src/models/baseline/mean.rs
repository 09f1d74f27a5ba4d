//! Historical mean forecast.

use super::{check_interval, continue_series, residual_variance};
use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::{FableError, Result};
use crate::models::traits::{draw_innovation, residual_pool, Coefficient, Glance, ModelFit};
use crate::spec::{MeanSpec, ModelFamily, ModelSpec};
use crate::utils::stats::mean;
use rand::rngs::StdRng;

/// Every forecast equals the mean of the observed training values.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanFit {
    series: TimeSeries,
    mean: f64,
    sigma2: f64,
    nobs: usize,
    fitted: Vec<f64>,
}

/// Fit the historical mean. Needs two observed values.
pub fn fit_mean(series: &TimeSeries) -> Result<MeanFit> {
    let observed = series.observed();
    if observed.len() < 2 {
        return Err(FableError::InsufficientData {
            needed: 2,
            got: observed.len(),
        });
    }
    let mu = mean(&observed);
    let fitted = vec![mu; series.len()];
    let sigma2 = residual_variance(series.values(), &fitted, 1).ok_or(
        FableError::InsufficientData {
            needed: 2,
            got: observed.len(),
        },
    )?;
    Ok(MeanFit {
        series: series.clone(),
        mean: mu,
        sigma2,
        nobs: observed.len(),
        fitted,
    })
}

impl MeanFit {
    pub fn mean(&self) -> f64 {
        self.mean
    }
}

impl ModelFit for MeanFit {
    fn family(&self) -> ModelFamily {
        ModelFamily::Mean
    }

    fn label(&self) -> String {
        "MEAN".to_string()
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec::Mean(MeanSpec)
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
        Glance::without_likelihood(self.sigma2, self.nobs, 1)
    }

    fn coefficients(&self) -> Vec<Coefficient> {
        vec![Coefficient::new("mean", self.mean)]
    }

    /// Variance includes the uncertainty of the estimated mean.
    fn forecast(&self, h: usize, _options: &ForecastOptions) -> Result<Vec<Distribution>> {
        let sd = (self.sigma2 * (1.0 + 1.0 / self.nobs as f64)).sqrt();
        (0..h).map(|_| Distribution::normal(self.mean, sd)).collect()
    }

    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>> {
        let pool = residual_pool(&self.residuals());
        Ok((0..h)
            .map(|_| self.mean + draw_innovation(rng, self.sigma2, &pool, bootstrap))
            .collect())
    }

    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        check_interval(&self.series, series)?;
        if options.reestimate {
            return fit_mean(series).map_err(|e| FableError::Refit(e.to_string()));
        }
        Ok(Self {
            series: series.clone(),
            nobs: series.observed_count(),
            fitted: vec![self.mean; series.len()],
            ..self.clone()
        })
    }

    fn stream(mut self, new_data: &TimeSeries) -> Result<Self> {
        if new_data.is_empty() {
            return Ok(self);
        }
        self.series = continue_series(&self.series, new_data)?;
        self.fitted.resize(self.series.len(), self.mean);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Interval::months(1), values).unwrap()
    }

    #[test]
    fn mean_forecast() {
        let model = fit_mean(&series(vec![1.0, 2.0, f64::NAN, 3.0])).unwrap();
        assert_relative_eq!(model.mean(), 2.0);
        assert_relative_eq!(model.sigma2(), 1.0);
        let dists = model.forecast(2, &ForecastOptions::default()).unwrap();
        assert_eq!(dists.len(), 2);
        assert_relative_eq!(dists[1].mean(), 2.0);
        assert_relative_eq!(dists[1].variance(), 1.0 + 1.0 / 3.0, epsilon = 1e-12);
        assert!(model.glance().aicc.is_none());
    }

    #[test]
    fn interpolate_fills_with_mean() {
        let model = fit_mean(&series(vec![1.0, f64::NAN, 3.0])).unwrap();
        let filled = model.interpolate().unwrap();
        assert_eq!(filled.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_observation_is_insufficient() {
        assert!(matches!(
            fit_mean(&series(vec![f64::NAN, 5.0])),
            Err(FableError::InsufficientData { needed: 2, got: 1 })
        ));
    }
}
