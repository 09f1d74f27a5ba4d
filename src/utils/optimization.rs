//! Bounded Nelder-Mead minimisation used by the likelihood fitters.
//!
//! Objectives may return non-finite values for inadmissible points; these are
//! ranked as `+inf` so the simplex walks away from them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub optimal_point: Vec<f64>,
    pub optimal_value: f64,
    /// Iterations over all restarts.
    pub iterations: usize,
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Stop when the spread of objective values falls below this, scaled
    /// by `1 + |f|` at the best vertex.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative size of the initial simplex.
    pub initial_step: f64,
    /// Extra runs restarted from the previous optimum.
    pub restarts: usize,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
            restarts: 1,
        }
    }
}

impl NelderMeadConfig {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }
}

/// Minimise `objective` starting from `initial`, keeping every coordinate in
/// `bounds` (when given) by clamping.
///
/// # Example
/// ```
/// use fable_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: Vec::new(),
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let score = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let mut start = clamp(initial, bounds);
    let mut best = Run {
        point: start.clone(),
        value: score(&start),
        iterations: 0,
        converged: false,
    };
    let mut iterations = 0;
    // A converged run stays converged unless a later run improves on it.
    let mut settled = false;

    for _ in 0..=config.restarts {
        let run = Simplex::new(&start, bounds, &config, &score).run(&score, bounds, &config);
        iterations += run.iterations;
        let improved = run.value < best.value - config.tolerance;
        if run.value <= best.value {
            settled = run.converged || (settled && !improved);
            best = run;
        }
        if !improved && settled {
            break;
        }
        start = best.point.clone();
    }

    NelderMeadResult {
        optimal_point: best.point,
        optimal_value: best.value,
        iterations,
        converged: settled,
    }
}

struct Run {
    point: Vec<f64>,
    value: f64,
    iterations: usize,
    converged: bool,
}

struct Simplex {
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl Simplex {
    fn new<F: Fn(&[f64]) -> f64>(
        start: &[f64],
        bounds: Option<&[(f64, f64)]>,
        config: &NelderMeadConfig,
        score: &F,
    ) -> Self {
        let mut vertices = vec![start.to_vec()];
        for i in 0..start.len() {
            let mut v = start.to_vec();
            let step = if start[i].abs() > 1e-8 {
                config.initial_step * start[i].abs()
            } else {
                config.initial_step
            };
            v[i] += step;
            let mut v = clamp(&v, bounds);
            // A vertex pinned on its bound collapses the simplex; step inward.
            if v[i] == start[i] {
                v[i] -= step;
                v = clamp(&v, bounds);
            }
            vertices.push(v);
        }
        let values = vertices.iter().map(|v| score(v)).collect();
        Self { vertices, values }
    }

    fn order(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.vertices.len()).collect();
        idx.sort_by(|&a, &b| {
            self.values[a]
                .partial_cmp(&self.values[b])
                .unwrap_or(Ordering::Equal)
        });
        idx
    }

    fn centroid(&self, exclude: usize) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let mut c = vec![0.0; dim];
        for (i, v) in self.vertices.iter().enumerate() {
            if i != exclude {
                for (cj, vj) in c.iter_mut().zip(v) {
                    *cj += vj;
                }
            }
        }
        let count = (self.vertices.len() - 1) as f64;
        c.iter_mut().for_each(|x| *x /= count);
        c
    }

    fn run<F: Fn(&[f64]) -> f64>(
        mut self,
        score: &F,
        bounds: Option<&[(f64, f64)]>,
        config: &NelderMeadConfig,
    ) -> Run {
        let n = self.vertices.len() - 1;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iter {
            iterations += 1;
            let idx = self.order();
            let (best, worst, second) = (idx[0], idx[n], idx[n - 1]);

            let spread = self.values[worst] - self.values[best];
            let centroid = self.centroid(worst);
            let size = self
                .vertices
                .iter()
                .map(|v| distance(v, &self.vertices[best]))
                .fold(0.0, f64::max);
            let scale = 1.0 + self.values[best].abs();
            if (spread.is_finite() && spread.abs() < config.tolerance * scale)
                || size < config.tolerance
            {
                converged = true;
                break;
            }

            let reflected = clamp(&towards(&centroid, &self.vertices[worst], -config.alpha), bounds);
            let fr = score(&reflected);

            if fr < self.values[best] {
                let expanded = clamp(&towards(&centroid, &reflected, config.gamma), bounds);
                let fe = score(&expanded);
                if fe < fr {
                    self.replace(worst, expanded, fe);
                } else {
                    self.replace(worst, reflected, fr);
                }
                continue;
            }
            if fr < self.values[second] {
                self.replace(worst, reflected, fr);
                continue;
            }

            let (target, ft) = if fr < self.values[worst] {
                (reflected, fr)
            } else {
                (self.vertices[worst].clone(), self.values[worst])
            };
            let contracted = clamp(&towards(&centroid, &target, config.rho), bounds);
            let fc = score(&contracted);
            if fc < ft {
                self.replace(worst, contracted, fc);
                continue;
            }

            let anchor = self.vertices[best].clone();
            for i in 0..=n {
                if i == best {
                    continue;
                }
                let shrunk = clamp(&towards(&anchor, &self.vertices[i], config.sigma), bounds);
                let fs = score(&shrunk);
                self.replace(i, shrunk, fs);
            }
        }

        let best = self.order()[0];
        Run {
            point: self.vertices.swap_remove(best),
            value: self.values[best],
            iterations,
            converged,
        }
    }

    fn replace(&mut self, i: usize, vertex: Vec<f64>, value: f64) {
        self.vertices[i] = vertex;
        self.values[i] = value;
    }
}

/// `from + t * (to - from)`; `t < 0` reflects `to` through `from`.
fn towards(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, x)| f + t * (x - f)).collect()
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| match b.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect(),
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quadratic_minimum() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            NelderMeadConfig::default(),
        );
        assert!(result.converged);
        assert_relative_eq!(result.optimal_point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn rosenbrock_with_restarts() {
        let config = NelderMeadConfig::default()
            .with_max_iter(5000)
            .with_tolerance(1e-12)
            .with_restarts(3);
        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.2, 1.0],
            None,
            config,
        );
        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(result.optimal_point[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn bounds_are_respected() {
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)]),
            NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn start_on_bound_still_moves() {
        let result = nelder_mead(
            |x| (x[0] - 0.5).powi(2),
            &[1.0],
            Some(&[(0.0, 1.0)]),
            NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn non_finite_regions_are_avoided() {
        // log barrier undefined for x <= 0
        let result = nelder_mead(
            |x| if x[0] <= 0.0 { f64::NAN } else { x[0] - x[0].ln() },
            &[3.0],
            None,
            NelderMeadConfig::default(),
        );
        assert!(result.optimal_value.is_finite());
        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let objective = |x: &[f64]| 1000.0 + (x[0] - 4.0).powi(2) + (x[1] + 2.0).powi(2);
        let capped = nelder_mead(objective, &[0.0, 0.0], None, NelderMeadConfig::default().with_max_iter(1));
        assert!(!capped.converged);
        assert!(capped.iterations <= 2);

        let full = nelder_mead(objective, &[0.0, 0.0], None, NelderMeadConfig::default());
        assert!(full.converged);
        assert_relative_eq!(full.optimal_point[0], 4.0, epsilon = 1e-2);
    }

    #[test]
    fn empty_problem() {
        let result = nelder_mead(|_| 0.0, &[], None, NelderMeadConfig::default());
        assert!(!result.converged);
        assert!(result.optimal_value.is_nan());
    }
}
