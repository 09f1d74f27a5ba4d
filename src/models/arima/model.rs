//! Seasonal ARIMA estimation for a fixed order, and the fitted model.
//!
//! The series is differenced by `(1 - B)^d (1 - B^m)^D`, an optional constant
//! is subtracted, and the remainder is treated as a stationary, invertible
//! ARMA process whose exact Gaussian likelihood comes from a Kalman filter.

use super::diff::{apply_differencing, differencing_polynomial, integrate};
use super::kalman::{self, FilterOutput, KalmanState, StateSpace};
use super::params::{expand, poly_mul, roots_outside, unconstrained_to_coeffs};
use crate::config::{ForecastOptions, RefitOptions};
use crate::core::TimeSeries;
use crate::distribution::Distribution;
use crate::error::{FableError, Result};
use crate::models::traits::{
    draw_innovation, forecast_rng, paths_to_distributions, residual_pool, Coefficient, Glance,
    ModelFit,
};
use crate::spec::{ArimaSpec, ModelFamily, ModelSpec};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{information_criteria, mean, InformationCriteria};
use rand::rngs::StdRng;
use serde::Serialize;
use std::fmt;

/// Roots of the AR and MA polynomials must lie outside this radius.
const ROOT_MARGIN: f64 = 1.01;
/// Bound on each unconstrained coefficient; `tanh(4)` is about 0.9993.
const PACF_LIMIT: f64 = 4.0;

/// Orders of a seasonal ARIMA model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            period: 1,
        }
    }

    pub fn with_seasonal(mut self, p: usize, d: usize, q: usize, period: usize) -> Self {
        self.seasonal_p = p;
        self.seasonal_d = d;
        self.seasonal_q = q;
        self.period = period;
        self
    }

    pub fn is_seasonal(&self) -> bool {
        self.period > 1 && self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }

    /// Number of AR and MA coefficients.
    pub fn arma_terms(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Total differencing order `d + D`.
    pub fn total_differencing(&self) -> usize {
        self.d + self.seasonal_d
    }

    /// Observations consumed by differencing.
    pub(crate) fn lost(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    pub(crate) fn differencing(&self) -> Vec<f64> {
        differencing_polynomial(self.d, self.seasonal_d, self.period)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(
                f,
                "({},{},{})[{}]",
                self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
            )?;
        }
        Ok(())
    }
}

/// Model label, with the constant named as a mean or a drift.
pub(crate) fn describe(order: &ArimaOrder, constant: bool) -> String {
    match (constant, order.total_differencing()) {
        (true, 0) => format!("{} w/ mean", order),
        (true, _) => format!("{} w/ drift", order),
        (false, _) => order.to_string(),
    }
}

/// Estimated coefficients, factor by factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sar: Vec<f64>,
    pub sma: Vec<f64>,
    /// Mean of the differenced series, when included.
    pub constant: Option<f64>,
}

impl ArimaCoefficients {
    fn from_unconstrained(order: &ArimaOrder, x: &[f64], constant: bool) -> Self {
        let (p, q, sp) = (order.p, order.q, order.seasonal_p);
        let n = order.arma_terms();
        let negate = |v: Vec<f64>| v.into_iter().map(|c| -c).collect::<Vec<f64>>();
        Self {
            ar: unconstrained_to_coeffs(&x[..p]),
            ma: negate(unconstrained_to_coeffs(&x[p..p + q])),
            sar: unconstrained_to_coeffs(&x[p + q..p + q + sp]),
            sma: negate(unconstrained_to_coeffs(&x[p + q + sp..n])),
            constant: if constant { x.get(n).copied() } else { None },
        }
    }

    /// AR coefficients of the expanded polynomial.
    pub(crate) fn full_ar(&self, period: usize) -> Vec<f64> {
        expand(&self.ar, &self.sar, period, -1.0)
    }

    /// MA coefficients of the expanded polynomial.
    pub(crate) fn full_ma(&self, period: usize) -> Vec<f64> {
        expand(&self.ma, &self.sma, period, 1.0)
    }

    fn state_space(&self, period: usize) -> StateSpace {
        StateSpace::new(&self.full_ar(period), &self.full_ma(period))
    }

    fn constant_or_zero(&self) -> f64 {
        self.constant.unwrap_or(0.0)
    }
}

/// Differenced series with the leading positions removed.
fn differenced(values: &[f64], order: &ArimaOrder) -> Vec<f64> {
    let z = apply_differencing(values, &order.differencing());
    z.into_iter().skip(order.lost()).collect()
}

fn run_filter(coefs: &ArimaCoefficients, period: usize, z: &[f64]) -> Option<FilterOutput> {
    let c = coefs.constant_or_zero();
    let centred: Vec<f64> = z.iter().map(|v| v - c).collect();
    let ss = coefs.state_space(period);
    let out = kalman::filter(&ss, ss.initial_state(), &centred)?;
    (out.nobs > 0).then_some(out)
}

/// Conditional sum-of-squares criterion, `n/2 ln(SSE/n)`, with residuals
/// before the first full AR lag taken as zero. Used for starting values.
fn conditional_sum_of_squares(z: &[f64], coefs: &ArimaCoefficients, period: usize) -> f64 {
    let ar = coefs.full_ar(period);
    let ma = coefs.full_ma(period);
    let c = coefs.constant_or_zero();
    let mut e = vec![0.0; z.len()];
    let (mut sse, mut n) = (0.0, 0usize);
    for t in ar.len()..z.len() {
        if z[t].is_nan() || (1..=ar.len()).any(|i| z[t - i].is_nan()) {
            continue;
        }
        let mut pred: f64 = ar.iter().enumerate().map(|(i, a)| a * (z[t - i - 1] - c)).sum();
        pred += ma
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, m)| m * e[t - j - 1])
            .sum::<f64>();
        e[t] = z[t] - c - pred;
        sse += e[t] * e[t];
        n += 1;
    }
    if n == 0 || !(sse > 0.0) {
        return f64::INFINITY;
    }
    0.5 * n as f64 * (sse / n as f64).ln()
}

/// Maximum likelihood estimate for one order.
pub(crate) struct Estimate {
    coefs: ArimaCoefficients,
    filter: FilterOutput,
}

/// Estimate the coefficients of `order` on `values`. Errors are reasons
/// suitable for a failed-candidate record.
pub(crate) fn estimate(
    values: &[f64],
    order: &ArimaOrder,
    constant: bool,
    max_iter: usize,
) -> std::result::Result<Estimate, String> {
    let z = differenced(values, order);
    let nobs = z.iter().filter(|v| !v.is_nan()).count();
    let k = order.arma_terms() + usize::from(constant) + 1;
    if nobs <= k + 1 {
        return Err(format!(
            "{} differenced observations are too few for {} parameters",
            nobs, k
        ));
    }

    let mut x0 = vec![0.0; order.arma_terms()];
    let mut bounds = vec![(-PACF_LIMIT, PACF_LIMIT); order.arma_terms()];
    if constant {
        x0.push(mean(&z));
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));
    }

    let period = order.period;
    let x = if x0.is_empty() {
        x0
    } else {
        let config = NelderMeadConfig {
            initial_step: 0.5,
            ..NelderMeadConfig::default().with_max_iter(max_iter)
        };
        let css_objective = |x: &[f64]| {
            conditional_sum_of_squares(&z, &ArimaCoefficients::from_unconstrained(order, x, constant), period)
        };
        let start = nelder_mead(css_objective, &x0, Some(bounds.as_slice()), config).optimal_point;
        let objective = |x: &[f64]| {
            let coefs = ArimaCoefficients::from_unconstrained(order, x, constant);
            match run_filter(&coefs, period, &z) {
                Some(out) => -out.log_lik(),
                None => f64::INFINITY,
            }
        };
        let result = nelder_mead(objective, &start, Some(bounds.as_slice()), config);
        if !result.converged {
            return Err(format!(
                "optimiser hit max_iter ({}) without converging after {} iterations",
                max_iter, result.iterations
            ));
        }
        result.optimal_point
    };

    let coefs = ArimaCoefficients::from_unconstrained(order, &x, constant);
    let filter = run_filter(&coefs, period, &z)
        .ok_or_else(|| "likelihood could not be evaluated".to_string())?;
    if !filter.log_lik().is_finite() {
        return Err("likelihood is not finite".to_string());
    }
    if !roots_outside(&coefs.full_ar(period), ROOT_MARGIN) {
        return Err("autoregressive polynomial has a root near the unit circle".to_string());
    }
    let ma_as_ar: Vec<f64> = coefs.full_ma(period).iter().map(|c| -c).collect();
    if !roots_outside(&ma_as_ar, ROOT_MARGIN) {
        return Err("moving-average polynomial has a root near the unit circle".to_string());
    }
    Ok(Estimate { coefs, filter })
}

/// Level-scale prediction at `t` from a differenced-scale prediction.
fn undifference_at(values: &[f64], t: usize, z_pred: f64, delta: &[f64]) -> f64 {
    let carried: f64 = delta
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| c * values[t - k])
        .sum();
    z_pred - carried
}

/// Fill the first `lost` positions, which have no one-step prediction.
/// A missing value takes the nearest later observation at the same seasonal
/// position, falling back to the first observation of the series.
fn backcast(values: &[f64], order: &ArimaOrder) -> Vec<f64> {
    let lost = order.lost().min(values.len());
    let step = if order.seasonal_d > 0 { order.period.max(1) } else { 1 };
    let first = values.iter().copied().find(|v| !v.is_nan()).unwrap_or(0.0);
    (0..lost)
        .map(|t| {
            values[t..]
                .iter()
                .step_by(step)
                .copied()
                .find(|v| !v.is_nan())
                .unwrap_or(first)
        })
        .collect()
}

/// Undifference one-step predictions onto the level scale, appending to
/// `filled` as it goes. Missing values in `filled` take their prediction so
/// later levels stay finite. Returns the level-scale predictions.
fn extend_levels(
    filled: &mut Vec<f64>,
    values: &[f64],
    predictions: &[f64],
    c: f64,
    delta: &[f64],
) -> Vec<f64> {
    predictions
        .iter()
        .map(|pred| {
            let t = filled.len();
            let level = undifference_at(filled, t, pred + c, delta);
            filled.push(if values[t].is_nan() { level } else { values[t] });
            level
        })
        .collect()
}

/// A fitted ARIMA model.
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaFit {
    spec: ArimaSpec,
    order: ArimaOrder,
    coefs: ArimaCoefficients,
    series: TimeSeries,
    fitted: Vec<f64>,
    innovations: Vec<f64>,
    state: KalmanState,
    sigma2: f64,
    log_lik: f64,
    ic: InformationCriteria,
    nobs: usize,
    n_params: usize,
    candidate_scores: Vec<(String, f64)>,
}

impl ArimaFit {
    pub(crate) fn from_estimate(
        spec: ArimaSpec,
        order: ArimaOrder,
        estimate: Estimate,
        series: TimeSeries,
    ) -> Self {
        let Estimate { coefs, filter } = estimate;
        let lost = order.lost().min(series.len());
        let delta = order.differencing();
        let c = coefs.constant_or_zero();
        let values = series.values();

        let lead = backcast(values, &order);
        let mut fitted: Vec<f64> = values[..lost]
            .iter()
            .zip(&lead)
            .map(|(y, b)| if y.is_nan() { *b } else { f64::NAN })
            .collect();
        let mut filled = lead;
        fitted.extend(extend_levels(&mut filled, values, &filter.predictions, c, &delta));
        let mut innovations = vec![f64::NAN; lost];
        innovations.extend_from_slice(&filter.innovations);

        let n_params = order.arma_terms() + usize::from(coefs.constant.is_some()) + 1;
        let log_lik = filter.log_lik();
        Self {
            spec,
            order,
            sigma2: filter.sigma2(),
            ic: information_criteria(log_lik, n_params, filter.nobs),
            nobs: filter.nobs,
            log_lik,
            n_params,
            coefs,
            series,
            fitted,
            innovations,
            state: filter.state,
            candidate_scores: Vec::new(),
        }
    }

    pub(crate) fn with_candidate_scores(mut self, scores: Vec<(String, f64)>) -> Self {
        self.candidate_scores = scores;
        self
    }

    pub(crate) fn with_spec(mut self, spec: ArimaSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn arima_coefficients(&self) -> &ArimaCoefficients {
        &self.coefs
    }

    pub fn information_criteria(&self) -> InformationCriteria {
        self.ic
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// Criterion value of every fitted candidate, best first.
    pub fn candidate_scores(&self) -> &[(String, f64)] {
        &self.candidate_scores
    }

    /// One-step prediction errors on the differenced scale. The first
    /// `d + D m` entries are `NaN`.
    pub fn innovations(&self) -> &[f64] {
        &self.innovations
    }

    /// Training values with gaps filled by one-step predictions or, before
    /// the first prediction, by backcasts. Seeds undifferencing.
    fn history(&self) -> Vec<f64> {
        self.series
            .values()
            .iter()
            .zip(&self.fitted)
            .map(|(y, f)| if y.is_nan() { *f } else { *y })
            .collect()
    }

    /// Weights of the infinite MA form of the full (differenced) model.
    fn psi_weights(&self, h: usize) -> Vec<f64> {
        let period = self.order.period;
        let mut ar_poly = vec![1.0];
        ar_poly.extend(self.coefs.full_ar(period).iter().map(|c| -c));
        let phi: Vec<f64> = poly_mul(&ar_poly, &self.order.differencing())
            .into_iter()
            .skip(1)
            .map(|c| -c)
            .collect();
        let theta = self.coefs.full_ma(period);

        let mut psi = vec![1.0];
        for j in 1..h {
            let mut value = theta.get(j - 1).copied().unwrap_or(0.0);
            for (k, a) in phi.iter().enumerate().take(j) {
                value += a * psi[j - k - 1];
            }
            psi.push(value);
        }
        psi
    }

    fn check_interval(&self, series: &TimeSeries) -> Result<()> {
        if series.interval() != self.series.interval() {
            return Err(FableError::Refit(format!(
                "series interval {} differs from the fitted interval {}",
                series.interval(),
                self.series.interval()
            )));
        }
        Ok(())
    }
}

impl ModelFit for ArimaFit {
    fn family(&self) -> ModelFamily {
        ModelFamily::Arima
    }

    fn label(&self) -> String {
        describe(&self.order, self.coefs.constant.is_some())
    }

    fn spec(&self) -> ModelSpec {
        ModelSpec::Arima(self.spec.clone())
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
        Glance::with_likelihood(self.sigma2, self.log_lik, self.ic, self.nobs, self.n_params)
    }

    fn coefficients(&self) -> Vec<Coefficient> {
        let named = |prefix: &str, values: &[f64]| -> Vec<Coefficient> {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Coefficient::new(format!("{}{}", prefix, i + 1), *v))
                .collect()
        };
        let mut out = named("ar", &self.coefs.ar);
        out.extend(named("ma", &self.coefs.ma));
        out.extend(named("sar", &self.coefs.sar));
        out.extend(named("sma", &self.coefs.sma));
        if let Some(c) = self.coefs.constant {
            out.push(Coefficient::new("constant", c));
        }
        out
    }

    fn forecast(&self, h: usize, options: &ForecastOptions) -> Result<Vec<Distribution>> {
        if h == 0 {
            return Ok(Vec::new());
        }
        if options.bootstrap {
            let mut rng = forecast_rng(options);
            let paths = self.generate(h, options.times.max(1), &mut rng, true)?;
            return paths_to_distributions(&paths, h);
        }

        let ss = self.coefs.state_space(self.order.period);
        let c = self.coefs.constant_or_zero();
        let mut a = self.state.a.clone();
        let z: Vec<f64> = (0..h)
            .map(|_| {
                let next = a[0] + c;
                a = ss.transition().dot(&a);
                next
            })
            .collect();
        let means = integrate(&self.history(), &z, &self.order.differencing());

        let psi = self.psi_weights(h);
        let mut acc = 0.0;
        means
            .iter()
            .zip(&psi)
            .map(|(mu, w)| {
                acc += w * w;
                Distribution::normal(*mu, (self.sigma2 * acc).sqrt())
            })
            .collect()
    }

    fn simulate(&self, h: usize, rng: &mut StdRng, bootstrap: bool) -> Result<Vec<f64>> {
        let ss = self.coefs.state_space(self.order.period);
        let c = self.coefs.constant_or_zero();
        let pool = residual_pool(&self.innovations);
        let mut a = self.state.a.clone();
        let z: Vec<f64> = (0..h)
            .map(|_| {
                let e = draw_innovation(rng, self.sigma2, &pool, bootstrap);
                let x = &a + &(ss.noise_input() * e);
                a = ss.transition().dot(&x);
                x[0] + c
            })
            .collect();
        Ok(integrate(&self.history(), &z, &self.order.differencing()))
    }

    fn refit(&self, series: &TimeSeries, options: &RefitOptions) -> Result<Self> {
        self.check_interval(series)?;
        let o = self.order;

        if options.reestimate {
            let mut fixed = self
                .spec
                .clone()
                .with_order(o.p, o.d, o.q)
                .with_seasonal_order(o.seasonal_p, o.seasonal_d, o.seasonal_q)
                .with_period(o.period)
                .with_constant(self.coefs.constant.is_some());
            fixed.max_iter = self.spec.max_iter;
            let refitted = super::auto::fit_arima(series, &fixed)
                .map_err(|e| FableError::Refit(format!("{}: {}", self.label(), e)))?;
            return Ok(refitted.with_spec(self.spec.clone()));
        }

        let z = differenced(series.values(), &o);
        let filter = run_filter(&self.coefs, o.period, &z).ok_or_else(|| {
            FableError::Refit(format!(
                "{} cannot be filtered over {} observations",
                self.label(),
                series.len()
            ))
        })?;
        let estimate = Estimate {
            coefs: self.coefs.clone(),
            filter,
        };
        Ok(Self::from_estimate(self.spec.clone(), o, estimate, series.clone()))
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
        let combined = self
            .series
            .append(new_data)
            .map_err(|e| FableError::Stream(e.to_string()))?;
        let start = self.series.len();
        let delta = self.order.differencing();
        let c = self.coefs.constant_or_zero();
        let z: Vec<f64> = apply_differencing(combined.values(), &delta)[start..]
            .iter()
            .map(|v| v - c)
            .collect();

        let ss = self.coefs.state_space(self.order.period);
        let out = kalman::filter(&ss, self.state.clone(), &z)
            .ok_or_else(|| FableError::Stream("state filter degenerated".to_string()))?;

        let mut filled = self.history();
        let levels = extend_levels(&mut filled, combined.values(), &out.predictions, c, &delta);
        self.fitted.extend(levels);
        self.innovations.extend_from_slice(&out.innovations);
        if out.nobs > 0 {
            self.log_lik += out.log_lik_at(self.sigma2);
            self.nobs += out.nobs;
            self.ic = information_criteria(self.log_lik, self.n_params, self.nobs);
        }
        self.state = out.state;
        self.series = combined;
        Ok(self)
    }
}
