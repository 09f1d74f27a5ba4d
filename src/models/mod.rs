//! Forecasting models.
//!
//! Each family implements [`ModelFit`]; [`FittedModel`] is the closed set of
//! fitted families stored in mable cells, and [`FittedModel::fit`] is the
//! single entry point from a [`ModelSpec`].

mod traits;

pub mod arima;
pub mod baseline;
pub mod ets;

pub use traits::{Coefficient, Components, Glance, ModelFit};

use crate::config::{ForecastOptions, RefitOptions};
use crate::core::{Horizon, TimeSeries};
use crate::distribution::Distribution;
use crate::error::Result;
use crate::spec::{ModelFamily, ModelSpec};
use arima::ArimaFit;
use baseline::{MeanFit, NaiveFit, SeasonalNaiveFit};
use ets::EtsFit;
use rand::rngs::StdRng;

/// A fitted model of any supported family.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    Ets(EtsFit),
    Arima(ArimaFit),
    Mean(MeanFit),
    Naive(NaiveFit),
    SeasonalNaive(SeasonalNaiveFit),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            FittedModel::Ets($m) => $body,
            FittedModel::Arima($m) => $body,
            FittedModel::Mean($m) => $body,
            FittedModel::Naive($m) => $body,
            FittedModel::SeasonalNaive($m) => $body,
        }
    };
}

macro_rules! rewrap {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            FittedModel::Ets($m) => $body.map(FittedModel::Ets),
            FittedModel::Arima($m) => $body.map(FittedModel::Arima),
            FittedModel::Mean($m) => $body.map(FittedModel::Mean),
            FittedModel::Naive($m) => $body.map(FittedModel::Naive),
            FittedModel::SeasonalNaive($m) => $body.map(FittedModel::SeasonalNaive),
        }
    };
}

impl FittedModel {
    /// Fit `spec` to `series`.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use fable_forecast::core::{Interval, TimeSeries};
    /// use fable_forecast::models::FittedModel;
    /// use fable_forecast::spec::{ModelSpec, NaiveSpec};
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let series = TimeSeries::regular(start, Interval::days(1), vec![3.0, 5.0, 4.0]).unwrap();
    /// let model = FittedModel::fit(&ModelSpec::Naive(NaiveSpec::default()), &series).unwrap();
    /// assert_eq!(model.label(), "NAIVE");
    /// ```
    pub fn fit(spec: &ModelSpec, series: &TimeSeries) -> Result<Self> {
        spec.validate()?;
        let model = match spec {
            ModelSpec::Ets(s) => FittedModel::Ets(ets::fit_ets(series, s)?),
            ModelSpec::Arima(s) => FittedModel::Arima(arima::fit_arima(series, s)?),
            ModelSpec::Mean(_) => FittedModel::Mean(baseline::fit_mean(series)?),
            ModelSpec::Naive(s) => FittedModel::Naive(baseline::fit_naive(series, s)?),
            ModelSpec::SeasonalNaive(s) => {
                FittedModel::SeasonalNaive(baseline::fit_seasonal_naive(series, s)?)
            }
        };
        Ok(model)
    }

    pub fn family(&self) -> ModelFamily {
        dispatch!(self, m => m.family())
    }

    /// Label of the selected structure, e.g. `ETS(M,Ad,N)` or
    /// `ARIMA(1,1,0)(0,1,1)[4] w/ drift`.
    pub fn label(&self) -> String {
        dispatch!(self, m => m.label())
    }

    pub fn spec(&self) -> ModelSpec {
        dispatch!(self, m => m.spec())
    }

    pub fn series(&self) -> &TimeSeries {
        dispatch!(self, m => m.series())
    }

    pub fn fitted(&self) -> &[f64] {
        dispatch!(self, m => m.fitted())
    }

    pub fn residuals(&self) -> Vec<f64> {
        dispatch!(self, m => m.residuals())
    }

    pub fn sigma2(&self) -> f64 {
        dispatch!(self, m => m.sigma2())
    }

    pub fn glance(&self) -> Glance {
        dispatch!(self, m => m.glance())
    }

    pub fn coefficients(&self) -> Vec<Coefficient> {
        dispatch!(self, m => m.coefficients())
    }

    pub fn components(&self) -> Components {
        dispatch!(self, m => m.components())
    }

    pub fn interpolate(&self) -> Result<TimeSeries> {
        dispatch!(self, m => m.interpolate())
    }

    /// Forecast distributions for a horizon given in steps or as a span of
    /// time, which must be a whole number of the series' intervals.
    pub fn forecast(
        &self,
        horizon: Horizon,
        options: &ForecastOptions,
    ) -> Result<Vec<Distribution>> {
        let h = horizon.resolve(&self.series().interval())?;
        dispatch!(self, m => m.forecast(h, options))
    }

    pub fn generate(
        &self,
        h: usize,
        n_paths: usize,
        rng: &mut StdRng,
        bootstrap: bool,
    ) -> Result<Vec<Vec<f64>>> {
        dispatch!(self, m => m.generate(h, n_paths, rng, bootstrap))
    }

    /// The same structure applied to `series`.
    pub fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        rewrap!(self, m => m.refit(series, options))
    }

    /// Extend the model with observations that continue its series.
    pub fn stream(self, new_data: &TimeSeries) -> Result<Self> {
        rewrap!(self, m => m.stream(new_data))
    }

    pub fn as_ets(&self) -> Option<&EtsFit> {
        match self {
            FittedModel::Ets(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_arima(&self) -> Option<&ArimaFit> {
        match self {
            FittedModel::Arima(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::error::FableError;
    use crate::spec::{ArimaSpec, EtsSpec, MeanSpec, SeasonalNaiveSpec};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn quarterly(n: usize) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let pattern = [5.0, -2.0, 3.0, -6.0];
        let values = (0..n)
            .map(|t| 50.0 + 0.4 * t as f64 + pattern[t % 4] + ((t * 7) % 5) as f64 * 0.3)
            .collect();
        TimeSeries::regular(start, Interval::quarters(1), values).unwrap()
    }

    #[test]
    fn every_family_fits_and_forecasts() {
        let series = quarterly(40);
        let specs = [
            ModelSpec::Ets(EtsSpec::default()),
            ModelSpec::Arima(ArimaSpec::default()),
            ModelSpec::Mean(MeanSpec),
            ModelSpec::Naive(Default::default()),
            ModelSpec::SeasonalNaive(SeasonalNaiveSpec::default()),
        ];
        for spec in &specs {
            let model = FittedModel::fit(spec, &series).unwrap();
            assert_eq!(model.family(), spec.family());
            assert_eq!(&model.spec(), spec);
            let dists = model
                .forecast(Horizon::Steps(8), &ForecastOptions::default().with_seed(1)).unwrap();
            assert_eq!(dists.len(), 8);
            assert!(dists.iter().all(|d| d.mean().is_finite()));
        }
    }

    #[test]
    fn family_accessors_match_the_variant() {
        let series = quarterly(40);
        let arima = FittedModel::fit(&ModelSpec::Arima(ArimaSpec::default()), &series).unwrap();
        assert!(arima.as_ets().is_none());
        let inner = arima.as_arima().unwrap();
        assert_eq!(inner.label(), arima.label());

        let ets = FittedModel::fit(&ModelSpec::Ets(EtsSpec::default()), &series).unwrap();
        assert!(ets.as_arima().is_none());
        assert_eq!(ets.as_ets().unwrap().label(), ets.label());
    }

    #[test]
    fn span_horizon_resolves_against_interval() {
        let model = FittedModel::fit(&ModelSpec::Mean(MeanSpec), &quarterly(12)).unwrap();
        let two_years = model
            .forecast(Horizon::Span(Interval::years(2)), &ForecastOptions::default())
            .unwrap();
        assert_eq!(two_years.len(), 8);
        let err = model
            .forecast(Horizon::Span(Interval::months(1)), &ForecastOptions::default())
            .unwrap_err();
        assert!(matches!(err, FableError::InvalidParameter(_)));
    }

    #[test]
    fn refit_and_stream_keep_the_variant() {
        let series = quarterly(40);
        let model = FittedModel::fit(&ModelSpec::Ets(EtsSpec::default()), &series.head(32)).unwrap();
        let streamed = model.clone().stream(&series.tail_from(32)).unwrap();
        assert!(streamed.as_ets().is_some());
        assert_eq!(streamed.label(), model.label());
        assert_eq!(streamed.series().len(), 40);

        let refitted = model.refit(&series, &RefitOptions::reestimate()).unwrap();
        assert_eq!(refitted.label(), model.label());
        assert_relative_eq!(refitted.glance().nobs as f64, 40.0);
    }
}
