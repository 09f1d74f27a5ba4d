//! Automatic ARIMA order selection.
//!
//! Differencing orders come first: seasonal differences while the seasonal
//! strength exceeds 0.64, then first differences while KPSS rejects
//! stationarity. The remaining (p, q, P, Q, constant) space is searched
//! stepwise or exhaustively.

use super::diff::seasonal_difference;
use super::model::{describe, estimate, ArimaFit, ArimaOrder};
use crate::core::TimeSeries;
use crate::error::{FailedCandidate, FableError, Result};
use crate::spec::{ArimaSpec, Auto, SearchStrategy};
use crate::validation::{ndiffs, nsdiffs};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::debug;

/// Criterion values closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-8;
/// Largest grid searched exhaustively under [`SearchStrategy::Auto`].
const EXHAUSTIVE_GRID: usize = 100;

/// A point of the search space. The derived ordering is the canonical
/// enumeration order used to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Candidate {
    p: usize,
    q: usize,
    seasonal_p: usize,
    seasonal_q: usize,
    constant: bool,
}

impl Candidate {
    fn n_params(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q + usize::from(self.constant) + 1
    }
}

/// Admissible values of each searched dimension.
struct Space {
    p: RangeInclusive<usize>,
    q: RangeInclusive<usize>,
    seasonal_p: RangeInclusive<usize>,
    seasonal_q: RangeInclusive<usize>,
    constants: Vec<bool>,
    max_order: usize,
}

impl Space {
    fn contains(&self, c: &Candidate) -> bool {
        self.p.contains(&c.p)
            && self.q.contains(&c.q)
            && self.seasonal_p.contains(&c.seasonal_p)
            && self.seasonal_q.contains(&c.seasonal_q)
            && self.constants.contains(&c.constant)
            && c.p + c.q + c.seasonal_p + c.seasonal_q <= self.max_order
    }

    fn grid_size(&self) -> usize {
        let len = |r: &RangeInclusive<usize>| r.end() - r.start() + 1;
        len(&self.p) * len(&self.q) * len(&self.seasonal_p) * len(&self.seasonal_q)
            * self.constants.len()
    }

    fn enumerate(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for p in self.p.clone() {
            for q in self.q.clone() {
                for seasonal_p in self.seasonal_p.clone() {
                    for seasonal_q in self.seasonal_q.clone() {
                        for &constant in &self.constants {
                            let c = Candidate {
                                p,
                                q,
                                seasonal_p,
                                seasonal_q,
                                constant,
                            };
                            if self.contains(&c) {
                                out.push(c);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn clamp(&self, p: usize, q: usize, seasonal_p: usize, seasonal_q: usize) -> Candidate {
        let clamp = |v: usize, r: &RangeInclusive<usize>| v.clamp(*r.start(), *r.end());
        Candidate {
            p: clamp(p, &self.p),
            q: clamp(q, &self.q),
            seasonal_p: clamp(seasonal_p, &self.seasonal_p),
            seasonal_q: clamp(seasonal_q, &self.seasonal_q),
            constant: self.constants.contains(&true),
        }
    }
}

fn range(order: Auto<usize>, max: usize) -> RangeInclusive<usize> {
    match order {
        Auto::Fixed(v) => v..=v,
        Auto::Auto => 0..=max,
    }
}

fn shift(v: usize, delta: isize) -> Option<usize> {
    v.checked_add_signed(delta)
}

/// Stepwise neighbours of `c`, seasonal moves first.
fn neighbours(c: &Candidate) -> Vec<Candidate> {
    let moves: [(isize, isize, isize, isize); 12] = [
        (0, 0, -1, 0),
        (0, 0, 1, 0),
        (0, 0, 0, -1),
        (0, 0, 0, 1),
        (0, 0, -1, -1),
        (0, 0, 1, 1),
        (-1, 0, 0, 0),
        (1, 0, 0, 0),
        (0, -1, 0, 0),
        (0, 1, 0, 0),
        (-1, -1, 0, 0),
        (1, 1, 0, 0),
    ];
    let mut out: Vec<Candidate> = moves
        .iter()
        .filter_map(|&(dp, dq, dsp, dsq)| {
            Some(Candidate {
                p: shift(c.p, dp)?,
                q: shift(c.q, dq)?,
                seasonal_p: shift(c.seasonal_p, dsp)?,
                seasonal_q: shift(c.seasonal_q, dsq)?,
                constant: c.constant,
            })
        })
        .collect();
    out.push(Candidate {
        constant: !c.constant,
        ..*c
    });
    out
}

/// Memoised candidate evaluation and the running best.
struct Search<'a> {
    series: &'a TimeSeries,
    spec: &'a ArimaSpec,
    d: usize,
    seasonal_d: usize,
    period: usize,
    seen: HashMap<Candidate, Option<f64>>,
    attempts: Vec<FailedCandidate>,
    scores: Vec<(String, f64)>,
    best: Option<(Candidate, ArimaFit, f64)>,
}

impl<'a> Search<'a> {
    fn order(&self, c: &Candidate) -> ArimaOrder {
        ArimaOrder::new(c.p, self.d, c.q).with_seasonal(
            c.seasonal_p,
            self.seasonal_d,
            c.seasonal_q,
            self.period,
        )
    }

    /// Fit `c` unless already seen. Returns whether the best model changed.
    fn evaluate(&mut self, c: Candidate) -> bool {
        if self.seen.contains_key(&c) {
            return false;
        }
        let order = self.order(&c);
        let label = describe(&order, c.constant);
        let outcome = estimate(self.series.values(), &order, c.constant, self.spec.max_iter)
            .and_then(|est| {
                let fit = ArimaFit::from_estimate(self.spec.clone(), order, est, self.series.clone());
                let score = self.spec.criterion.score(&fit.information_criteria());
                if score.is_finite() {
                    Ok((fit, score))
                } else {
                    Err("information criterion is not finite".to_string())
                }
            });

        let (fit, score) = match outcome {
            Ok(ok) => ok,
            Err(reason) => {
                debug!(candidate = %label, %reason, "ARIMA candidate failed");
                self.attempts.push(FailedCandidate::new(label, reason));
                self.seen.insert(c, None);
                return false;
            }
        };
        debug!(candidate = %label, score, "fitted ARIMA candidate");
        self.seen.insert(c, Some(score));
        self.scores.push((label, score));

        let better = match &self.best {
            None => true,
            Some((current, _, current_score)) => {
                score < current_score - TIE_TOLERANCE
                    || ((score - current_score).abs() <= TIE_TOLERANCE
                        && (c.n_params(), c) < (current.n_params(), *current))
            }
        };
        if better {
            self.best = Some((c, fit, score));
        }
        better
    }

    fn exhaustive(&mut self, space: &Space) {
        for c in space.enumerate() {
            self.evaluate(c);
        }
    }

    fn stepwise(&mut self, space: &Space, seasonal: bool) {
        let max_steps = self.spec.limits.max_search_steps;
        let seeds = if seasonal {
            [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)]
        } else {
            [(2, 2, 0, 0), (0, 0, 0, 0), (1, 0, 0, 0), (0, 1, 0, 0)]
        };
        for (p, q, sp, sq) in seeds {
            let c = space.clamp(p, q, sp, sq);
            if space.contains(&c) && self.seen.len() < max_steps {
                self.evaluate(c);
            }
        }

        'climb: loop {
            let Some((current, _, _)) = &self.best else {
                break;
            };
            let current = *current;
            for n in neighbours(&current) {
                if !space.contains(&n) || self.seen.contains_key(&n) {
                    continue;
                }
                if self.seen.len() >= max_steps {
                    debug!(max_steps, "ARIMA stepwise search reached its step cap");
                    break 'climb;
                }
                if self.evaluate(n) {
                    continue 'climb;
                }
            }
            break;
        }
    }
}

/// Select and fit an ARIMA model for `series` under `spec`.
///
/// Fixed orders are honoured; automatic ones are chosen by the spec's
/// information criterion. Candidates whose likelihood cannot be evaluated,
/// or whose AR or MA polynomial has a root within 1.01 of the unit circle,
/// are skipped and recorded.
///
/// # Errors
///
/// * [`FableError::InvalidSpec`] for a fixed seasonal order on a
///   non-seasonal period.
/// * [`FableError::InsufficientData`] with fewer than three observations.
/// * [`FableError::FitFailure`] listing every attempt when no candidate
///   could be fitted, including constant series.
#[tracing::instrument(level = "debug", skip_all, fields(n = series.len()))]
pub fn fit_arima(series: &TimeSeries, spec: &ArimaSpec) -> Result<ArimaFit> {
    spec.validate()?;
    let period = spec.period.or(series.seasonal_period());
    let seasonal_fixed = [spec.seasonal_p, spec.seasonal_d, spec.seasonal_q]
        .iter()
        .any(|o| matches!(o, Auto::Fixed(v) if *v > 0));
    if period <= 1 && seasonal_fixed {
        return Err(FableError::InvalidSpec(format!(
            "seasonal ARIMA orders need a period greater than one, got {}",
            period
        )));
    }

    let observed = series.observed();
    if observed.len() < 3 {
        return Err(FableError::InsufficientData {
            needed: 3,
            got: observed.len(),
        });
    }
    if observed.iter().all(|&v| v == observed[0]) {
        return Err(FableError::FitFailure {
            model: "ARIMA".to_string(),
            attempts: vec![FailedCandidate::new(
                "ARIMA",
                "constant series has zero innovation variance",
            )],
        });
    }

    let seasonal = period > 1;
    let limits = &spec.limits;
    let seasonal_d = match spec.seasonal_d {
        Auto::Fixed(v) => v,
        Auto::Auto if seasonal => nsdiffs(&observed, period, limits.max_seasonal_d),
        Auto::Auto => 0,
    };
    let d = match spec.d {
        Auto::Fixed(v) => v,
        Auto::Auto => {
            let adjusted = seasonal_difference(&observed, seasonal_d, period);
            ndiffs(&adjusted, limits.max_d)
        }
    };
    debug!(d, seasonal_d, period, "chose ARIMA differencing");

    let constants = match spec.constant {
        Auto::Fixed(true) if d + seasonal_d > 1 => {
            return Err(FableError::FitFailure {
                model: "ARIMA".to_string(),
                attempts: vec![FailedCandidate::new(
                    format!("ARIMA(.,{},.)(.,{},.)[{}]", d, seasonal_d, period),
                    "a constant requires d + D <= 1",
                )],
            });
        }
        Auto::Fixed(c) => vec![c],
        Auto::Auto if d + seasonal_d <= 1 => vec![false, true],
        Auto::Auto => vec![false],
    };

    let seasonal_range = |order: Auto<usize>, max: usize| {
        if seasonal {
            range(order, max)
        } else {
            0..=0
        }
    };
    let mut space = Space {
        p: range(spec.p, limits.max_p),
        q: range(spec.q, limits.max_q),
        seasonal_p: seasonal_range(spec.seasonal_p, limits.max_seasonal_p),
        seasonal_q: seasonal_range(spec.seasonal_q, limits.max_seasonal_q),
        constants,
        max_order: limits.max_order,
    };
    let fixed_order =
        space.p.start() + space.q.start() + space.seasonal_p.start() + space.seasonal_q.start();
    space.max_order = space.max_order.max(fixed_order);

    let mut search = Search {
        series,
        spec,
        d,
        seasonal_d,
        period: if seasonal { period } else { 1 },
        seen: HashMap::new(),
        attempts: Vec::new(),
        scores: Vec::new(),
        best: None,
    };
    let exhaustive = match spec.search {
        SearchStrategy::Exhaustive => true,
        SearchStrategy::Stepwise => false,
        SearchStrategy::Auto => space.grid_size() <= EXHAUSTIVE_GRID,
    };
    if exhaustive {
        search.exhaustive(&space);
    } else {
        search.stepwise(&space, seasonal);
    }
    debug!(
        evaluated = search.seen.len(),
        failed = search.attempts.len(),
        exhaustive,
        "ARIMA search finished"
    );

    let Search {
        best,
        mut scores,
        attempts,
        ..
    } = search;
    match best {
        Some((_, fit, _)) => {
            scores.sort_by(|a, b| a.1.total_cmp(&b.1));
            Ok(fit.with_candidate_scores(scores))
        }
        None => Err(FableError::FitFailure {
            model: "ARIMA".to_string(),
            attempts,
        }),
    }
}
