//! ARMA state-space form and the Kalman filter used for exact likelihood.
//!
//! ```text
//! x[t+1] = T x[t] + R e[t+1]
//! z[t]   = x[t][0]
//! ```
//!
//! `T` is the companion matrix of the AR coefficients and
//! `R = [1, theta_1, ..., theta_q, 0, ...]`.

use ndarray::{Array1, Array2, Axis};
use std::f64::consts::PI;

#[derive(Clone, Debug)]
pub(crate) struct StateSpace {
    t: Array2<f64>,
    r_vec: Array1<f64>,
    rrt: Array2<f64>,
}

impl StateSpace {
    /// Companion form with state dimension `max(p, q + 1)`.
    pub(crate) fn new(ar: &[f64], ma: &[f64]) -> Self {
        let p = ar.len();
        let q = ma.len();
        let r = p.max(q + 1).max(1);

        let mut t = Array2::zeros((r, r));
        for (i, a) in ar.iter().enumerate() {
            t[[i, 0]] = *a;
        }
        for i in 0..r.saturating_sub(1) {
            t[[i, i + 1]] = 1.0;
        }

        let mut r_vec = Array1::zeros(r);
        r_vec[0] = 1.0;
        for (j, m) in ma.iter().enumerate() {
            r_vec[j + 1] = *m;
        }

        let r_col = r_vec.view().insert_axis(Axis(1));
        let r_row = r_vec.view().insert_axis(Axis(0));
        let rrt = r_col.dot(&r_row);

        Self { t, r_vec, rrt }
    }

    pub(crate) fn dim(&self) -> usize {
        self.r_vec.len()
    }

    pub(crate) fn transition(&self) -> &Array2<f64> {
        &self.t
    }

    pub(crate) fn noise_input(&self) -> &Array1<f64> {
        &self.r_vec
    }

    /// Solve `P = T P T' + R R'` by the doubling algorithm. Requires a
    /// stationary `T`.
    pub(crate) fn stationary_covariance(&self) -> Array2<f64> {
        let mut p = self.rrt.clone();
        let mut a = self.t.clone();
        for _ in 0..64 {
            let next = &p + &a.dot(&p).dot(&a.t());
            let delta = (&next - &p).mapv(f64::abs).sum();
            let scale = next.mapv(f64::abs).sum().max(1.0);
            p = next;
            if delta <= 1e-12 * scale {
                break;
            }
            a = a.dot(&a);
        }
        p
    }

    /// Stationary starting state with zero mean.
    pub(crate) fn initial_state(&self) -> KalmanState {
        KalmanState {
            a: Array1::zeros(self.dim()),
            p: self.stationary_covariance(),
        }
    }

    fn predict(&self, state: &mut KalmanState) {
        state.a = self.t.dot(&state.a);
        state.p = self.t.dot(&state.p).dot(&self.t.t()) + &self.rrt;
    }
}

/// One-step predictive mean and covariance of the state, scaled by the
/// innovation variance.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct KalmanState {
    pub(crate) a: Array1<f64>,
    pub(crate) p: Array2<f64>,
}

/// Prediction-error decomposition of a filtering pass.
#[derive(Clone, Debug)]
pub(crate) struct FilterOutput {
    /// One-step predictions of the input.
    pub(crate) predictions: Vec<f64>,
    /// One-step prediction errors, `NaN` where the input is missing.
    pub(crate) innovations: Vec<f64>,
    sum_sq: f64,
    sum_log_f: f64,
    pub(crate) nobs: usize,
    pub(crate) state: KalmanState,
}

impl FilterOutput {
    /// Maximum likelihood innovation variance.
    pub(crate) fn sigma2(&self) -> f64 {
        self.sum_sq / self.nobs as f64
    }

    /// Gaussian log-likelihood with the variance concentrated out.
    pub(crate) fn log_lik(&self) -> f64 {
        self.log_lik_at(self.sigma2())
    }

    /// Gaussian log-likelihood of the filtered observations at a given
    /// innovation variance.
    pub(crate) fn log_lik_at(&self, sigma2: f64) -> f64 {
        let n = self.nobs as f64;
        -0.5 * (n * (2.0 * PI * sigma2).ln() + self.sum_log_f + self.sum_sq / sigma2)
    }
}

/// Filter `z` (already centred) from `start`. Returns `None` when the
/// prediction variance degenerates. An all-missing input yields `nobs == 0`.
pub(crate) fn filter(ss: &StateSpace, start: KalmanState, z: &[f64]) -> Option<FilterOutput> {
    let mut state = start;
    let mut out = FilterOutput {
        predictions: Vec::with_capacity(z.len()),
        innovations: Vec::with_capacity(z.len()),
        sum_sq: 0.0,
        sum_log_f: 0.0,
        nobs: 0,
        state: state.clone(),
    };

    for &obs in z {
        out.predictions.push(state.a[0]);
        if obs.is_nan() {
            out.innovations.push(f64::NAN);
            ss.predict(&mut state);
            continue;
        }
        let f = state.p[[0, 0]];
        if !(f > 1e-12) || !f.is_finite() {
            return None;
        }
        let v = obs - state.a[0];
        let gain = state.p.column(0).to_owned();
        state.a = &state.a + &(&gain * (v / f));
        let g_col = gain.view().insert_axis(Axis(1));
        let g_row = gain.view().insert_axis(Axis(0));
        state.p = &state.p - &(g_col.dot(&g_row) / f);
        ss.predict(&mut state);

        out.innovations.push(v);
        out.sum_sq += v * v / f;
        out.sum_log_f += f.ln();
        out.nobs += 1;
    }

    if !out.sum_sq.is_finite() {
        return None;
    }
    out.state = state;
    Some(out)
}
