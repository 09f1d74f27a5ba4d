//! Naive forecast and random walk with drift.
//!
//! The forecast repeats the last observed value, plus `h` times the average
//! change when drift is enabled.

use super::{check_interval, continue_series, residual_variance};
use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::{FableError, Result};
use crate::models::traits::{draw_innovation, residual_pool, Coefficient, Glance, ModelFit};
use crate::spec::{ModelFamily, ModelSpec, NaiveSpec};
use rand::rngs::StdRng;

/// A fitted naive or random-walk-with-drift model.
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveFit {
    spec: NaiveSpec,
    series: TimeSeries,
    drift: Option<f64>,
    /// Steps between the first and last observation used for the drift.
    span: usize,
    sigma2: f64,
    fitted: Vec<f64>,
}

/// Index and value of the last observed value before `end`.
fn last_observed(values: &[f64], end: usize) -> Option<(usize, f64)> {
    values[..end]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, v)| !v.is_nan())
        .map(|(i, v)| (i, *v))
}

/// One-step predictions: the last observed value carried forward across
/// gaps, plus drift for every step elapsed.
fn naive_fitted(values: &[f64], drift: f64) -> Vec<f64> {
    (0..values.len())
        .map(|t| match last_observed(values, t) {
            Some((j, y)) => y + drift * (t - j) as f64,
            None => f64::NAN,
        })
        .collect()
}

/// Fit a naive model, estimating the drift when `spec.drift` is set.
pub fn fit_naive(series: &TimeSeries, spec: &NaiveSpec) -> Result<NaiveFit> {
    let values = series.values();
    let insufficient = || FableError::InsufficientData {
        needed: 2 + usize::from(spec.drift),
        got: series.observed_count(),
    };
    let first = values.iter().position(|v| !v.is_nan()).ok_or_else(insufficient)?;
    let (last, last_value) = last_observed(values, values.len()).ok_or_else(insufficient)?;
    let span = last - first;
    if span == 0 {
        return Err(insufficient());
    }

    let drift = spec
        .drift
        .then(|| (last_value - values[first]) / span as f64);
    let fitted = naive_fitted(values, drift.unwrap_or(0.0));
    let sigma2 = residual_variance(values, &fitted, usize::from(spec.drift))
        .ok_or_else(insufficient)?;
    Ok(NaiveFit {
        spec: *spec,
        series: series.clone(),
        drift,
        span,
        sigma2,
        fitted,
    })
}

impl NaiveFit {
    pub fn drift(&self) -> Option<f64> {
        self.drift
    }

    /// Steps from the last observed value to the first forecast, and that
    /// value.
    fn anchor(&self) -> Result<(usize, f64)> {
        let values = self.series.values();
        let (j, y) = last_observed(values, values.len())
            .ok_or_else(|| FableError::ComputationError("no observed value".to_string()))?;
        Ok((values.len() - j, y))
    }
}

impl ModelFit for NaiveFit {
    fn family(&self) -> ModelFamily {
        ModelFamily::Naive
    }

    fn label(&self) -> String {
        if self.drift.is_some() {
            "RW w/ drift".to_string()
        } else {
            "NAIVE".to_string()
        }
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec::Naive(self.spec)
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
        Glance::without_likelihood(
            self.sigma2,
            self.series.observed_count(),
            usize::from(self.drift.is_some()),
        )
    }

    fn coefficients(&self) -> Vec<Coefficient> {
        self.drift
            .map(|b| vec![Coefficient::new("drift", b)])
            .unwrap_or_default()
    }

    /// Variance `sigma2 k`, plus `sigma2 k^2 / T` for the estimated drift,
    /// where `k` counts steps since the last observation.
    fn forecast(&self, h: usize, _options: &ForecastOptions) -> Result<Vec<Distribution>> {
        let (offset, last) = self.anchor()?;
        (0..h)
            .map(|j| {
                let k = (offset + j) as f64;
                let mut variance = self.sigma2 * k;
                let mut mu = last;
                if let Some(b) = self.drift {
                    mu += b * k;
                    variance += self.sigma2 * k * k / self.span as f64;
                }
                Distribution::normal(mu, variance.sqrt())
            })
            .collect()
    }

    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>> {
        let (offset, last) = self.anchor()?;
        let pool = residual_pool(&self.residuals());
        let drift = self.drift.unwrap_or(0.0);
        let mut y = last;
        let mut step = || drift + draw_innovation(rng, self.sigma2, &pool, bootstrap);
        for _ in 1..offset {
            y += step();
        }
        Ok((0..h)
            .map(|_| {
                y += step();
                y
            })
            .collect())
    }

    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        check_interval(&self.series, series)?;
        if options.reestimate {
            return fit_naive(series, &self.spec).map_err(|e| FableError::Refit(e.to_string()));
        }
        if series.observed_count() == 0 {
            return Err(FableError::Refit(format!(
                "{} needs at least one observed value",
                self.label()
            )));
        }
        Ok(Self {
            series: series.clone(),
            fitted: naive_fitted(series.values(), self.drift.unwrap_or(0.0)),
            ..self.clone()
        })
    }

    fn stream(mut self, new_data: &TimeSeries) -> Result<Self> {
        if new_data.is_empty() {
            return Ok(self);
        }
        self.series = continue_series(&self.series, new_data)?;
        self.fitted = naive_fitted(self.series.values(), self.drift.unwrap_or(0.0));
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
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Interval::days(1), values).unwrap()
    }

    #[test]
    fn naive_repeats_last_value_with_growing_variance() {
        let model = fit_naive(&series(vec![1.0, 3.0, 2.0, 5.0]), &NaiveSpec::default()).unwrap();
        assert_relative_eq!(model.sigma2(), (4.0 + 1.0 + 9.0) / 3.0, epsilon = 1e-12);
        let dists = model.forecast(3, &ForecastOptions::default()).unwrap();
        for (j, d) in dists.iter().enumerate() {
            assert_relative_eq!(d.mean(), 5.0);
            assert_relative_eq!(d.variance(), model.sigma2() * (j + 1) as f64, epsilon = 1e-12);
        }
        assert_eq!(model.label(), "NAIVE");
    }

    #[test]
    fn fitted_values_are_shifted_history() {
        let model = fit_naive(&series(vec![1.0, 2.0, f64::NAN, 4.0]), &NaiveSpec::default()).unwrap();
        let fitted = model.fitted();
        assert!(fitted[0].is_nan());
        assert_eq!(&fitted[1..], &[1.0, 2.0, 2.0]);
    }

    #[test]
    fn drift_is_average_change() {
        let model = fit_naive(&series(vec![10.0, 12.0, 13.0, 16.0]), &NaiveSpec::with_drift()).unwrap();
        assert_relative_eq!(model.drift().unwrap(), 2.0);
        assert_eq!(model.label(), "RW w/ drift");
        let dists = model.forecast(2, &ForecastOptions::default()).unwrap();
        assert_relative_eq!(dists[0].mean(), 18.0);
        assert_relative_eq!(dists[1].mean(), 20.0);
        assert_eq!(model.coefficients()[0].term, "drift");
    }

    #[test]
    fn stream_keeps_parameters() {
        let full = series(vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0]);
        let model = fit_naive(&full.head(4), &NaiveSpec::default()).unwrap();
        let streamed = model.clone().stream(&full.tail_from(4)).unwrap();
        assert_eq!(streamed.sigma2(), model.sigma2());
        assert_eq!(streamed.fitted()[5], 4.0);
        let dists = streamed.forecast(1, &ForecastOptions::default()).unwrap();
        assert_relative_eq!(dists[0].mean(), 6.0);

        let gap = full.tail_from(5);
        assert!(matches!(model.stream(&gap), Err(FableError::Stream(_))));
    }
}
