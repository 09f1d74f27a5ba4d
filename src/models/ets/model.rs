//! ETS state-space recursions, likelihood and forecast distributions.
//!
//! States are updated in error-correction form:
//!
//! ```text
//! q  = l + phi b
//! l' = q + alpha (p - q)          p = y, y - s, y / s
//! b' = phi b + beta (p - q)
//! s' = s + gamma (t - s)          t = y - q, y / q
//! ```
//!
//! where `s` is the seasonal state from one period earlier. The update does
//! not depend on the error type; the error type only enters the likelihood
//! and the forecast variance.

use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::{FableError, Result};
use crate::models::traits::{
    draw_innovation, forecast_rng, paths_to_distributions, residual_pool, Coefficient, Components,
    Glance, ModelFit,
};
use crate::spec::{ErrorType, EtsComponents, EtsSpec, ModelFamily, ModelSpec, SeasonalType};
use crate::utils::stats::{information_criteria, InformationCriteria};
use rand::rngs::StdRng;
use serde::Serialize;
use std::f64::consts::PI;

/// Smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EtsParams {
    pub alpha: f64,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub phi: Option<f64>,
}

impl EtsParams {
    fn phi_or_one(&self) -> f64 {
        self.phi.unwrap_or(1.0)
    }
}

/// Level, slope and seasonal states.
///
/// `season[0]` is the most recent seasonal state and `season[m - 1]` the
/// one applied to the next observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtsState {
    pub level: f64,
    pub slope: f64,
    pub season: Vec<f64>,
}

impl EtsState {
    fn damped_slope(&self, c: &EtsComponents, phi: f64) -> f64 {
        if c.has_trend() {
            phi * self.slope
        } else {
            0.0
        }
    }

    fn next_season(&self) -> f64 {
        self.season.last().copied().unwrap_or(0.0)
    }

    fn push_season(&mut self, value: f64) {
        if !self.season.is_empty() {
            self.season.pop();
            self.season.insert(0, value);
        }
    }
}

fn combine(season: SeasonalType, q: f64, s: f64) -> f64 {
    match season {
        SeasonalType::None => q,
        SeasonalType::Additive => q + s,
        SeasonalType::Multiplicative => q * s,
    }
}

/// One-step prediction from `state`.
pub(crate) fn predict(c: &EtsComponents, p: &EtsParams, state: &EtsState) -> f64 {
    let q = state.level + state.damped_slope(c, p.phi_or_one());
    combine(c.season, q, state.next_season())
}

/// Advance `state` by observation `y` and return the one-step prediction
/// made before seeing it. A missing `y` propagates the state without
/// correction.
pub(crate) fn step(c: &EtsComponents, p: &EtsParams, state: &mut EtsState, y: f64) -> f64 {
    let phib = state.damped_slope(c, p.phi_or_one());
    let q = state.level + phib;
    let s = state.next_season();
    let yhat = combine(c.season, q, s);

    if y.is_nan() {
        state.level = q;
        state.slope = phib;
        state.push_season(s);
        return yhat;
    }

    let deseasoned = match c.season {
        SeasonalType::None => y,
        SeasonalType::Additive => y - s,
        SeasonalType::Multiplicative => y / s,
    };
    state.level = q + p.alpha * (deseasoned - q);
    if c.has_trend() {
        state.slope = phib + p.beta.unwrap_or(0.0) * (deseasoned - q);
    }
    if c.has_season() {
        let detrended = match c.season {
            SeasonalType::Multiplicative => y / q,
            _ => y - q,
        };
        state.push_season(s + p.gamma.unwrap_or(0.0) * (detrended - s));
    }
    yhat
}

fn innovation(error: ErrorType, y: f64, yhat: f64) -> f64 {
    match error {
        ErrorType::Additive => y - yhat,
        ErrorType::Multiplicative => (y - yhat) / yhat,
    }
}

/// Sufficient statistics for the Gaussian likelihood.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LikelihoodTerms {
    sse: f64,
    sum_log_abs: f64,
    nobs: usize,
}

impl LikelihoodTerms {
    pub(crate) fn log_lik(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * PI * self.sse / n).ln() + 1.0) - self.sum_log_abs
    }
}

fn is_multiplicative(c: &EtsComponents) -> bool {
    c.is_multiplicative_error() || c.is_multiplicative_season()
}

/// Run the recursions and accumulate likelihood terms without keeping the
/// state path. Returns `None` when a prediction leaves the admissible
/// region (non-finite, or non-positive under a multiplicative component).
pub(crate) fn likelihood_terms(
    c: &EtsComponents,
    p: &EtsParams,
    initial: &EtsState,
    values: &[f64],
) -> Option<LikelihoodTerms> {
    let mut state = initial.clone();
    let mut terms = LikelihoodTerms {
        sse: 0.0,
        sum_log_abs: 0.0,
        nobs: 0,
    };
    let multiplicative = is_multiplicative(c);
    for &y in values {
        let yhat = step(c, p, &mut state, y);
        if !yhat.is_finite() || (multiplicative && yhat <= 0.0) {
            return None;
        }
        if y.is_nan() {
            continue;
        }
        let e = innovation(c.error, y, yhat);
        terms.sse += e * e;
        if c.is_multiplicative_error() {
            terms.sum_log_abs += yhat.abs().ln();
        }
        terms.nobs += 1;
    }
    (terms.nobs > 0 && terms.sse.is_finite()).then_some(terms)
}

/// Per-observation output of a full filtering pass.
#[derive(Debug, Clone, Default, PartialEq)]
struct StatePath {
    fitted: Vec<f64>,
    innovations: Vec<f64>,
    level: Vec<f64>,
    slope: Vec<f64>,
    season: Vec<f64>,
}

impl StatePath {
    fn extend(&mut self, c: &EtsComponents, p: &EtsParams, state: &mut EtsState, values: &[f64]) {
        for &y in values {
            let yhat = step(c, p, state, y);
            self.fitted.push(yhat);
            self.innovations.push(if y.is_nan() {
                f64::NAN
            } else {
                innovation(c.error, y, yhat)
            });
            self.level.push(state.level);
            self.slope.push(state.slope);
            self.season.push(state.season.first().copied().unwrap_or(f64::NAN));
        }
    }

    fn likelihood_terms(&self, c: &EtsComponents) -> LikelihoodTerms {
        self.innovations
            .iter()
            .zip(&self.fitted)
            .filter(|(e, _)| !e.is_nan())
            .fold(
                LikelihoodTerms {
                    sse: 0.0,
                    sum_log_abs: 0.0,
                    nobs: 0,
                },
                |mut acc, (e, f)| {
                    acc.sse += e * e;
                    if c.is_multiplicative_error() {
                        acc.sum_log_abs += f.abs().ln();
                    }
                    acc.nobs += 1;
                    acc
                },
            )
    }
}

/// A fitted ETS model.
#[derive(Debug, Clone, PartialEq)]
pub struct EtsFit {
    spec: EtsSpec,
    components: EtsComponents,
    period: usize,
    params: EtsParams,
    initial: EtsState,
    state: EtsState,
    series: TimeSeries,
    path: StatePath,
    sigma2: f64,
    log_lik: f64,
    ic: InformationCriteria,
    n_params: usize,
    nobs: usize,
    candidate_scores: Vec<(EtsComponents, f64)>,
}

/// Estimated parameters, including initial states and the variance.
pub(crate) fn parameter_count(c: &EtsComponents, period: usize) -> usize {
    let seasonal_states = if c.has_season() { period.saturating_sub(1) } else { 0 };
    c.smoothing_params() + 1 + usize::from(c.has_trend()) + seasonal_states + 1
}

impl EtsFit {
    /// Filter `series` with fixed parameters and initial states.
    pub(crate) fn from_states(
        spec: EtsSpec,
        components: EtsComponents,
        period: usize,
        params: EtsParams,
        initial: EtsState,
        series: TimeSeries,
    ) -> Result<Self> {
        let mut state = initial.clone();
        let mut path = StatePath::default();
        path.extend(&components, &params, &mut state, series.values());

        let terms = path.likelihood_terms(&components);
        let (sse, nobs) = (terms.sse, terms.nobs);
        if nobs == 0 {
            return Err(FableError::InsufficientData { needed: 1, got: 0 });
        }
        if !sse.is_finite() {
            return Err(FableError::ComputationError(format!(
                "{} produced non-finite innovations",
                components
            )));
        }

        let n_params = parameter_count(&components, period);
        let log_lik = terms.log_lik();
        let dof = nobs.saturating_sub(n_params - 1);
        let sigma2 = if dof > 0 { sse / dof as f64 } else { sse / nobs as f64 };

        Ok(Self {
            spec,
            components,
            period,
            params,
            initial,
            state,
            series,
            path,
            sigma2,
            log_lik,
            ic: information_criteria(log_lik, n_params, nobs),
            n_params,
            nobs,
            candidate_scores: Vec::new(),
        })
    }

    pub(crate) fn with_candidate_scores(mut self, scores: Vec<(EtsComponents, f64)>) -> Self {
        self.candidate_scores = scores;
        self
    }

    pub(crate) fn with_spec(mut self, spec: EtsSpec) -> Self {
        self.spec = spec;
        self
    }

    /// The selected structure.
    pub fn components_selected(&self) -> EtsComponents {
        self.components
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn params(&self) -> &EtsParams {
        &self.params
    }

    pub fn initial_state(&self) -> &EtsState {
        &self.initial
    }

    /// State after the last observation.
    pub fn final_state(&self) -> &EtsState {
        &self.state
    }

    /// Innovation residuals: additive errors, or relative errors for
    /// multiplicative-error models.
    pub fn innovations(&self) -> &[f64] {
        &self.path.innovations
    }

    pub fn information_criteria(&self) -> InformationCriteria {
        self.ic
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// Criterion value of every fitted candidate, best first.
    pub fn candidate_scores(&self) -> &[(EtsComponents, f64)] {
        &self.candidate_scores
    }

    /// Coefficients `c_j = w' F^(j-1) g` of the linear innovations form,
    /// for `j = 1..h-1`.
    fn psi_weights(&self, h: usize) -> Vec<f64> {
        let c = &self.components;
        let phi = self.params.phi_or_one();
        let m = self.state.season.len();
        let mut v = vec![0.0; 2 + m];
        v[0] = self.params.alpha;
        if c.has_trend() {
            v[1] = self.params.beta.unwrap_or(0.0);
        }
        if m > 0 {
            v[2] = self.params.gamma.unwrap_or(0.0);
        }

        let mut weights = Vec::with_capacity(h.saturating_sub(1));
        for _ in 1..h {
            let seasonal = if m > 0 { v[1 + m] } else { 0.0 };
            let trend = if c.has_trend() { phi * v[1] } else { 0.0 };
            weights.push(v[0] + trend + seasonal);

            let mut next = vec![0.0; 2 + m];
            next[0] = v[0] + trend;
            next[1] = trend;
            if m > 0 {
                next[2] = v[1 + m];
                next[3..2 + m].copy_from_slice(&v[2..1 + m]);
            }
            v = next;
        }
        weights
    }

    fn point_forecasts(&self, h: usize) -> Vec<f64> {
        let mut state = self.state.clone();
        (0..h)
            .map(|_| step(&self.components, &self.params, &mut state, f64::NAN))
            .collect()
    }

    fn check_positive(&self, values: &[f64]) -> std::result::Result<(), String> {
        if is_multiplicative(&self.components) && values.iter().any(|v| !v.is_nan() && *v <= 0.0) {
            return Err(format!(
                "{} requires strictly positive observations",
                self.components
            ));
        }
        Ok(())
    }
}

impl ModelFit for EtsFit {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ets
    }

    fn label(&self) -> String {
        self.components.to_string()
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec::Ets(self.spec.clone())
    }

    fn series(&self) -> &TimeSeries {
        &self.series
    }

    fn fitted(&self) -> &[f64] {
        &self.path.fitted
    }

    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn glance(&self) -> Glance {
        Glance::with_likelihood(self.sigma2, self.log_lik, self.ic, self.nobs, self.n_params)
    }

    fn coefficients(&self) -> Vec<Coefficient> {
        let p = &self.params;
        let mut out = vec![Coefficient::new("alpha", p.alpha)];
        if let Some(beta) = p.beta {
            out.push(Coefficient::new("beta", beta));
        }
        if let Some(gamma) = p.gamma {
            out.push(Coefficient::new("gamma", gamma));
        }
        if let Some(phi) = p.phi {
            out.push(Coefficient::new("phi", phi));
        }
        out.push(Coefficient::new("l[0]", self.initial.level));
        if self.components.has_trend() {
            out.push(Coefficient::new("b[0]", self.initial.slope));
        }
        for (lag, s) in self.initial.season.iter().enumerate() {
            let term = if lag == 0 {
                "s[0]".to_string()
            } else {
                format!("s[-{}]", lag)
            };
            out.push(Coefficient::new(term, *s));
        }
        out
    }

    fn forecast(&self, h: usize, options: &ForecastOptions) -> Result<Vec<Distribution>> {
        if h == 0 {
            return Ok(Vec::new());
        }
        if options.bootstrap || self.components.is_multiplicative_season() {
            let mut rng = forecast_rng(options);
            let paths = self.generate(h, options.times.max(1), &mut rng, options.bootstrap)?;
            return paths_to_distributions(&paths, h);
        }

        let means = self.point_forecasts(h);
        let weights = self.psi_weights(h);
        let sigma2 = self.sigma2;

        let variances: Vec<f64> = match self.components.error {
            ErrorType::Additive => {
                let mut acc = 1.0;
                (0..h)
                    .map(|j| {
                        if j > 0 {
                            acc += weights[j - 1].powi(2);
                        }
                        sigma2 * acc
                    })
                    .collect()
            }
            ErrorType::Multiplicative => {
                let mut theta = Vec::with_capacity(h);
                for j in 0..h {
                    let carried: f64 = (1..=j).map(|i| weights[i - 1].powi(2) * theta[j - i]).sum();
                    theta.push(means[j].powi(2) + sigma2 * carried);
                }
                theta
                    .iter()
                    .zip(&means)
                    .map(|(t, mu)| ((1.0 + sigma2) * t - mu * mu).max(0.0))
                    .collect()
            }
        };

        means
            .iter()
            .zip(&variances)
            .map(|(mu, var)| Distribution::normal(*mu, var.sqrt()))
            .collect()
    }

    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>> {
        let pool = residual_pool(&self.path.innovations);
        let mut state = self.state.clone();
        let path = (0..h)
            .map(|_| {
                let yhat = predict(&self.components, &self.params, &state);
                let e = draw_innovation(rng, self.sigma2, &pool, bootstrap);
                let y = match self.components.error {
                    ErrorType::Additive => yhat + e,
                    ErrorType::Multiplicative => yhat * (1.0 + e),
                };
                step(&self.components, &self.params, &mut state, y);
                y
            })
            .collect();
        Ok(path)
    }

    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        if series.interval() != self.series.interval() {
            return Err(FableError::Refit(format!(
                "series interval {} differs from the fitted interval {}",
                series.interval(),
                self.series.interval()
            )));
        }
        self.check_positive(series.values()).map_err(FableError::Refit)?;

        if options.reestimate {
            let fixed = EtsSpec::fixed(self.components)
                .with_period(self.period)
                .with_criterion(self.spec.criterion)
                .with_max_iter(self.spec.max_iter);
            let refitted = super::auto::fit_ets(series, &fixed)
                .map_err(|e| FableError::Refit(format!("{}: {}", self.label(), e)))?;
            return Ok(refitted.with_spec(self.spec.clone()));
        }

        Self::from_states(
            self.spec.clone(),
            self.components,
            self.period,
            self.params,
            self.initial.clone(),
            series.clone(),
        )
        .map_err(|e| FableError::Refit(format!("{}: {}", self.label(), e)))
    }

    fn stream(mut self, new_data: &TimeSeries) -> Result<Self> {
        if new_data.is_empty() {
            return Ok(self);
        }
        if !self.series.is_continued_by(new_data) {
            return Err(FableError::Stream(format!(
                "new observations starting at {:?} do not continue the series ending at {:?}",
                new_data.start(),
                self.series.end()
            )));
        }
        self.check_positive(new_data.values()).map_err(FableError::Stream)?;

        self.series = self
            .series
            .append(new_data)
            .map_err(|e| FableError::Stream(e.to_string()))?;
        let mut state = self.state.clone();
        self.path
            .extend(&self.components, &self.params, &mut state, new_data.values());
        self.state = state;

        let terms = self.path.likelihood_terms(&self.components);
        if terms.nobs > 0 && terms.sse.is_finite() {
            self.log_lik = terms.log_lik();
            self.nobs = terms.nobs;
            self.ic = information_criteria(self.log_lik, self.n_params, self.nobs);
        }
        Ok(self)
    }

    fn components(&self) -> Components {
        let mut columns = vec![("level".to_string(), self.path.level.clone())];
        if self.components.has_trend() {
            columns.push(("slope".to_string(), self.path.slope.clone()));
        }
        if self.components.has_season() {
            columns.push(("season".to_string(), self.path.season.clone()));
        }
        columns.push(("remainder".to_string(), self.path.innovations.clone()));
        Components {
            timestamps: self.series.timestamps().to_vec(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::spec::TrendType;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Interval::quarters(1), values).unwrap()
    }

    fn ann(alpha: f64, level: f64, values: Vec<f64>) -> EtsFit {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::None, SeasonalType::None);
        EtsFit::from_states(
            EtsSpec::fixed(c),
            c,
            4,
            EtsParams {
                alpha,
                beta: None,
                gamma: None,
                phi: None,
            },
            EtsState {
                level,
                slope: 0.0,
                season: Vec::new(),
            },
            series(values),
        )
        .unwrap()
    }

    #[test]
    fn simple_smoothing_recursion() {
        let fit = ann(0.5, 10.0, vec![12.0, 11.0, 13.0]);
        assert_eq!(fit.fitted(), &[10.0, 11.0, 11.0]);
        assert_relative_eq!(fit.final_state().level, 12.0);
        assert_eq!(fit.residuals(), vec![2.0, 0.0, 2.0]);
    }

    #[test]
    fn missing_observation_propagates_state() {
        let fit = ann(0.5, 10.0, vec![12.0, f64::NAN, 13.0]);
        assert_eq!(fit.fitted(), &[10.0, 11.0, 11.0]);
        assert!(fit.innovations()[1].is_nan());
        assert_eq!(fit.glance().nobs, 2);
        let filled = fit.interpolate().unwrap();
        assert_eq!(filled.values(), &[12.0, 11.0, 13.0]);
    }

    #[test]
    fn additive_variance_grows_with_alpha() {
        let fit = ann(0.3, 10.0, vec![11.0, 9.0, 10.5, 9.5, 10.0, 10.2, 9.8, 10.1]);
        let dists = fit.forecast(4, &ForecastOptions::default()).unwrap();
        for (j, d) in dists.iter().enumerate() {
            let expected = fit.sigma2() * (1.0 + j as f64 * 0.09);
            assert_relative_eq!(d.variance(), expected, epsilon = 1e-10);
            assert_relative_eq!(d.mean(), fit.final_state().level, epsilon = 1e-12);
        }
    }

    #[test]
    fn holt_weights_are_linear() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::Additive, SeasonalType::None);
        let fit = EtsFit::from_states(
            EtsSpec::fixed(c),
            c,
            1,
            EtsParams {
                alpha: 0.4,
                beta: Some(0.1),
                gamma: None,
                phi: None,
            },
            EtsState {
                level: 5.0,
                slope: 1.0,
                season: Vec::new(),
            },
            series((0..12).map(|i| 5.0 + i as f64 + 0.1 * (i % 3) as f64).collect()),
        )
        .unwrap();
        let w = fit.psi_weights(4);
        assert_eq!(w.len(), 3);
        for (j, c) in w.iter().enumerate() {
            assert_relative_eq!(*c, 0.4 + 0.1 * (j + 1) as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn seasonal_state_rotates() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::None, SeasonalType::Additive);
        let p = EtsParams {
            alpha: 0.1,
            beta: None,
            gamma: Some(0.1),
            phi: None,
        };
        let mut state = EtsState {
            level: 10.0,
            slope: 0.0,
            season: vec![4.0, 3.0, 2.0, 1.0],
        };
        assert_relative_eq!(predict(&c, &p, &state), 11.0);
        step(&c, &p, &mut state, f64::NAN);
        assert_eq!(state.season, vec![1.0, 4.0, 3.0, 2.0]);
        assert_relative_eq!(predict(&c, &p, &state), 12.0);
    }

    #[test]
    fn stream_extends_and_rejects_gaps() {
        let fit = ann(0.5, 10.0, vec![12.0, 11.0, 13.0]);
        let unchanged = fit.clone().stream(&TimeSeries::empty(Interval::quarters(1))).unwrap();
        assert_eq!(unchanged, fit);

        let full = series(vec![12.0, 11.0, 13.0, 14.0, 12.0]);
        let next = full.tail_from(3);
        let streamed = fit.clone().stream(&next).unwrap();
        assert_eq!(streamed.series().len(), 5);
        assert_eq!(streamed.params(), fit.params());
        assert_eq!(streamed.sigma2(), fit.sigma2());
        assert_relative_eq!(streamed.fitted()[3], 12.0);

        let direct = ann(0.5, 10.0, full.values().to_vec());
        assert_eq!(streamed.glance().nobs, 5);
        assert_relative_eq!(
            streamed.glance().log_lik.unwrap(),
            direct.glance().log_lik.unwrap(),
            epsilon = 1e-12
        );
        assert_relative_eq!(streamed.glance().aic.unwrap(), direct.glance().aic.unwrap(), epsilon = 1e-12);

        let gap = full.tail_from(4);
        assert!(matches!(fit.stream(&gap), Err(FableError::Stream(_))));
    }

    #[test]
    fn refit_keeps_parameters_without_reestimation() {
        let fit = ann(0.5, 10.0, vec![12.0, 11.0, 13.0, 12.5]);
        let refit = fit
            .refit(&series(vec![20.0, 21.0, 19.0]), &RefitOptions::default())
            .unwrap();
        assert_eq!(refit.params(), fit.params());
        assert_eq!(refit.label(), fit.label());
        assert_eq!(refit.fitted()[0], 10.0);

        let monthly = TimeSeries::regular(
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            Interval::months(1),
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        assert!(matches!(
            fit.refit(&monthly, &RefitOptions::default()),
            Err(FableError::Refit(_))
        ));
    }

    #[test]
    fn multiplicative_season_forecasts_by_simulation() {
        let c = EtsComponents::new(
            ErrorType::Multiplicative,
            TrendType::None,
            SeasonalType::Multiplicative,
        );
        let values: Vec<f64> = (0..16).map(|i| 100.0 * [1.2, 0.8, 1.1, 0.9][i % 4]).collect();
        let fit = EtsFit::from_states(
            EtsSpec::fixed(c),
            c,
            4,
            EtsParams {
                alpha: 0.2,
                beta: None,
                gamma: Some(0.1),
                phi: None,
            },
            EtsState {
                level: 100.0,
                slope: 0.0,
                season: vec![0.9, 1.1, 0.8, 1.2],
            },
            series(values),
        )
        .unwrap();
        let options = ForecastOptions::default().with_seed(11).with_times(200);
        let a = fit.forecast(4, &options).unwrap();
        let b = fit.forecast(4, &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].family(), "sample");
        assert!(a[0].mean() > a[1].mean());
    }

    fn mnn(alpha: f64) -> EtsFit {
        let c = EtsComponents::new(ErrorType::Multiplicative, TrendType::None, SeasonalType::None);
        let values: Vec<f64> = (0..40)
            .map(|i| 100.0 * (1.0 + 0.08 * (((i * 29 + 7) % 17) as f64 / 8.0 - 1.0)))
            .collect();
        EtsFit::from_states(
            EtsSpec::fixed(c),
            c,
            4,
            EtsParams {
                alpha,
                beta: None,
                gamma: None,
                phi: None,
            },
            EtsState {
                level: 100.0,
                slope: 0.0,
                season: Vec::new(),
            },
            series(values),
        )
        .unwrap()
    }

    #[test]
    fn multiplicative_error_variance_has_closed_form() {
        let alpha = 0.3;
        let fit = mnn(alpha);
        let s2 = fit.sigma2();
        let mu = fit.final_state().level;
        let dists = fit.forecast(2, &ForecastOptions::default()).unwrap();
        assert_relative_eq!(dists[0].variance(), s2 * mu * mu, max_relative = 1e-10);
        let two = mu * mu * ((1.0 + s2) * (1.0 + s2 * alpha * alpha) - 1.0);
        assert_relative_eq!(dists[1].variance(), two, max_relative = 1e-10);
    }

    #[test]
    fn multiplicative_error_variance_matches_simulation() {
        use rand::SeedableRng;

        let fit = mnn(0.3);
        let h = 6;
        let analytic = fit.forecast(h, &ForecastOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let paths = fit.generate(h, 20_000, &mut rng, false).unwrap();
        let last: Vec<f64> = paths.iter().map(|p| p[h - 1]).collect();
        let n = last.len() as f64;
        let mean = last.iter().sum::<f64>() / n;
        let var = last.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert_relative_eq!(mean, analytic[h - 1].mean(), max_relative = 0.01);
        assert_relative_eq!(var, analytic[h - 1].variance(), max_relative = 0.1);
    }

    #[test]
    fn coefficient_names() {
        let fit = ann(0.5, 10.0, vec![12.0, 11.0, 13.0]);
        let terms: Vec<String> = fit.coefficients().into_iter().map(|c| c.term).collect();
        assert_eq!(terms, vec!["alpha", "l[0]"]);
        let comps = fit.components();
        assert_eq!(comps.names(), vec!["level", "remainder"]);
    }
}
