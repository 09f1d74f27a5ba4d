//! Automatic ETS structure selection.

use super::model::{likelihood_terms, parameter_count, EtsFit, EtsParams, EtsState};
use crate::core::TimeSeries;
use crate::error::{FailedCandidate, FableError, Result};
use crate::features::{classical_decomposition, DecompositionType};
use crate::spec::{ErrorType, EtsComponents, EtsSpec, SeasonalType, TrendType};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use tracing::debug;

const SMOOTHING_BOUNDS: (f64, f64) = (1e-4, 0.9999);
const PHI_BOUNDS: (f64, f64) = (0.8, 0.98);
/// Criterion values closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-8;

/// Fit every admissible candidate allowed by `spec` and keep the best by
/// the spec's information criterion.
///
/// Candidates are visited in canonical order. Ties are broken by fewer
/// parameters, then by canonical order. A constant series yields a
/// degenerate ETS(A,N,N) with zero variance when that structure is allowed.
///
/// # Errors
///
/// [`FableError::FitFailure`] lists every candidate that was excluded or
/// failed to optimise when none could be fitted.
#[tracing::instrument(level = "debug", skip_all, fields(n = series.len()))]
pub fn fit_ets(series: &TimeSeries, spec: &EtsSpec) -> Result<EtsFit> {
    spec.validate()?;
    let observed = series.observed();
    if observed.len() < 3 {
        return Err(FableError::InsufficientData {
            needed: 3,
            got: observed.len(),
        });
    }

    let period = spec.period.or(series.seasonal_period());
    let positive = observed.iter().all(|&v| v > 0.0);
    let candidates = spec.candidates();

    if observed.iter().all(|&v| v == observed[0]) {
        return fit_constant(series, spec, &candidates, observed[0]);
    }

    let mut attempts = Vec::new();
    let mut scores = Vec::new();
    let mut best: Option<(EtsFit, f64)> = None;

    for components in candidates {
        if let Some(reason) = exclusion(&components, period, series.len(), observed.len(), positive)
        {
            debug!(candidate = %components, %reason, "excluded ETS candidate");
            attempts.push(FailedCandidate::new(components.to_string(), reason));
            continue;
        }

        let fit = match fit_candidate(series, spec, components, period) {
            Ok(fit) => fit,
            Err(reason) => {
                debug!(candidate = %components, %reason, "ETS candidate failed");
                attempts.push(FailedCandidate::new(components.to_string(), reason));
                continue;
            }
        };

        let score = spec.criterion.score(&fit.information_criteria());
        if !score.is_finite() {
            attempts.push(FailedCandidate::new(
                components.to_string(),
                "information criterion is not finite",
            ));
            continue;
        }
        debug!(candidate = %components, score, "fitted ETS candidate");
        scores.push((components, score));

        let better = match &best {
            None => true,
            Some((current, current_score)) => {
                score < current_score - TIE_TOLERANCE
                    || ((score - current_score).abs() <= TIE_TOLERANCE
                        && fit.n_params() < current.n_params())
            }
        };
        if better {
            best = Some((fit, score));
        }
    }

    match best {
        Some((fit, _)) => {
            scores.sort_by(|a, b| a.1.total_cmp(&b.1));
            Ok(fit.with_candidate_scores(scores))
        }
        None => Err(FableError::FitFailure {
            model: "ETS".to_string(),
            attempts,
        }),
    }
}

/// Why `c` cannot be fitted to this data, checked before any optimisation.
fn exclusion(
    c: &EtsComponents,
    period: usize,
    len: usize,
    nobs: usize,
    positive: bool,
) -> Option<String> {
    if !positive && c.is_multiplicative_error() {
        return Some("multiplicative error requires strictly positive data".to_string());
    }
    if !positive && c.is_multiplicative_season() {
        return Some("multiplicative season requires strictly positive data".to_string());
    }
    if c.error == ErrorType::Additive && c.is_multiplicative_season() {
        return Some("additive error with multiplicative season is unstable".to_string());
    }
    if c.has_season() && period <= 1 {
        return Some("seasonal component needs a period greater than one".to_string());
    }
    if c.has_season() && len < 2 * period {
        return Some(format!(
            "seasonal component needs two full periods ({} observations), got {}",
            2 * period,
            len
        ));
    }
    let free = parameter_count(c, period) - 1;
    if nobs <= free + 4 {
        return Some(format!(
            "{} observations are too few for {} free parameters",
            nobs, free
        ));
    }
    None
}

fn fit_constant(
    series: &TimeSeries,
    spec: &EtsSpec,
    candidates: &[EtsComponents],
    value: f64,
) -> Result<EtsFit> {
    let ann = EtsComponents::new(ErrorType::Additive, TrendType::None, SeasonalType::None);
    if !candidates.contains(&ann) {
        return Err(FableError::FitFailure {
            model: "ETS".to_string(),
            attempts: candidates
                .iter()
                .map(|c| {
                    FailedCandidate::new(
                        c.to_string(),
                        "constant series only admits ETS(A,N,N)",
                    )
                })
                .collect(),
        });
    }
    debug!(value, "constant series, using degenerate ETS(A,N,N)");
    EtsFit::from_states(
        spec.clone(),
        ann,
        spec.period.or(series.seasonal_period()),
        EtsParams {
            alpha: SMOOTHING_BOUNDS.1,
            beta: None,
            gamma: None,
            phi: None,
        },
        EtsState {
            level: value,
            slope: 0.0,
            season: Vec::new(),
        },
        series.clone(),
    )
}

/// Heuristic initial states: seasonal indices from a classical
/// decomposition of the first three periods, level and slope from a least
/// squares line through the first `max(10, 2m)` seasonally adjusted values.
fn initial_state(values: &[f64], c: &EtsComponents, period: usize) -> Option<EtsState> {
    let n = values.len();
    let (indices, season) = if c.has_season() {
        let window = &values[..n.min(3 * period)];
        let kind = if c.is_multiplicative_season() {
            DecompositionType::Multiplicative
        } else {
            DecompositionType::Additive
        };
        let dec = classical_decomposition(window, period, kind)?;
        let season: Vec<f64> = dec.indices.iter().rev().copied().collect();
        (dec.indices, season)
    } else {
        (Vec::new(), Vec::new())
    };

    let span = n.min(10.max(2 * period));
    let (t, adjusted): (Vec<f64>, Vec<f64>) = values[..span]
        .iter()
        .enumerate()
        .filter(|(_, y)| !y.is_nan())
        .map(|(i, y)| {
            let adj = match c.season {
                SeasonalType::None => *y,
                SeasonalType::Additive => y - indices[i % period],
                SeasonalType::Multiplicative => y / indices[i % period],
            };
            ((i + 1) as f64, adj)
        })
        .unzip();
    if adjusted.len() < 2 {
        return None;
    }

    let k = adjusted.len() as f64;
    let t_mean = t.iter().sum::<f64>() / k;
    let y_mean = adjusted.iter().sum::<f64>() / k;
    let (level, slope) = if c.has_trend() {
        let sxy: f64 = t.iter().zip(&adjusted).map(|(a, b)| (a - t_mean) * (b - y_mean)).sum();
        let sxx: f64 = t.iter().map(|a| (a - t_mean).powi(2)).sum();
        let slope = sxy / sxx;
        (y_mean - slope * t_mean, slope)
    } else {
        (y_mean, 0.0)
    };
    Some(EtsState {
        level,
        slope,
        season,
    })
}

/// Map the optimiser's vector to parameters and initial states.
///
/// Layout: `[alpha, u?, v?, phi?, l0, b0?, s0..s(m-2)?]` with
/// `beta = alpha u` and `gamma = (1 - alpha) v`, which keeps `beta < alpha`
/// and `gamma < 1 - alpha`. The last seasonal state is implied: additive
/// states sum to zero and multiplicative states sum to `m`.
fn unpack(c: &EtsComponents, x: &[f64], template: &EtsState) -> (EtsParams, EtsState) {
    let mut it = x.iter().copied();
    let alpha = it.next().unwrap_or(SMOOTHING_BOUNDS.0);
    let beta = c.has_trend().then(|| alpha * it.next().unwrap_or(0.0));
    let gamma = c.has_season().then(|| (1.0 - alpha) * it.next().unwrap_or(0.0));
    let phi = if c.is_damped() { it.next() } else { None };
    let level = it.next().unwrap_or(template.level);
    let slope = if c.has_trend() {
        it.next().unwrap_or(template.slope)
    } else {
        0.0
    };
    let season = if c.has_season() && !template.season.is_empty() {
        let m = template.season.len();
        let mut season: Vec<f64> = template.season[..m - 1]
            .iter()
            .map(|&s| it.next().unwrap_or(s))
            .collect();
        let total: f64 = season.iter().sum();
        season.push(if c.is_multiplicative_season() {
            m as f64 - total
        } else {
            -total
        });
        season
    } else {
        template.season.clone()
    };
    (
        EtsParams {
            alpha,
            beta,
            gamma,
            phi,
        },
        EtsState {
            level,
            slope,
            season,
        },
    )
}

fn fit_candidate(
    series: &TimeSeries,
    spec: &EtsSpec,
    components: EtsComponents,
    period: usize,
) -> std::result::Result<EtsFit, String> {
    let values = series.values();
    let init = initial_state(values, &components, period)
        .ok_or_else(|| "could not initialise states".to_string())?;

    let free = SMOOTHING_BOUNDS;
    let unbounded = (f64::NEG_INFINITY, f64::INFINITY);
    let mut x0 = vec![0.2 / period.max(1) as f64 + 0.05];
    let mut bounds = vec![free];
    if components.has_trend() {
        x0.push(0.1);
        bounds.push(free);
    }
    if components.has_season() {
        x0.push(0.05);
        bounds.push(free);
    }
    if components.is_damped() {
        x0.push(0.97);
        bounds.push(PHI_BOUNDS);
    }
    x0.push(init.level);
    bounds.push(unbounded);
    if components.has_trend() {
        x0.push(init.slope);
        bounds.push(unbounded);
    }
    if components.has_season() {
        let state_bounds = if components.is_multiplicative_season() {
            (1e-3, f64::INFINITY)
        } else {
            unbounded
        };
        for &s in &init.season[..init.season.len().saturating_sub(1)] {
            x0.push(s);
            bounds.push(state_bounds);
        }
    }

    let objective = |x: &[f64]| {
        let (params, state) = unpack(&components, x, &init);
        match likelihood_terms(&components, &params, &state, values) {
            Some(terms) => -terms.log_lik(),
            None => f64::INFINITY,
        }
    };
    let config = NelderMeadConfig::default()
        .with_max_iter(spec.max_iter)
        .with_restarts(2);
    let result = nelder_mead(objective, &x0, Some(&bounds), config);
    if !result.optimal_value.is_finite() {
        return Err("likelihood is not finite anywhere the optimiser searched".to_string());
    }
    if !result.converged {
        return Err(format!(
            "optimiser hit max_iter ({}) without converging after {} iterations",
            spec.max_iter, result.iterations
        ));
    }

    let (params, initial) = unpack(&components, &result.optimal_point, &init);
    EtsFit::from_states(spec.clone(), components, period, params, initial, series.clone())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::models::ModelFit;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn quarterly(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Interval::quarters(1), values).unwrap()
    }

    fn seasonal_series(n: usize) -> Vec<f64> {
        let pattern = [1.15, 0.9, 1.05, 0.9];
        (0..n)
            .map(|i| {
                let noise = ((i * 37 + 11) % 23) as f64 / 23.0 - 0.5;
                (100.0 + 0.8 * i as f64) * pattern[i % 4] + 2.0 * noise
            })
            .collect()
    }

    #[test]
    fn selected_model_minimises_aicc() {
        let series = quarterly(seasonal_series(48));
        let fit = fit_ets(&series, &EtsSpec::default()).unwrap();
        let best = fit.glance().aicc.unwrap();
        let scores = fit.candidate_scores();
        assert!(scores.len() > 1);
        for (_, score) in scores {
            assert!(best <= *score + 1e-9);
        }
        assert!(scores.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(fit.components_selected().has_season());
    }

    #[test]
    fn fixed_structure_is_respected() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::AdditiveDamped, SeasonalType::None);
        let series = quarterly(seasonal_series(40));
        let fit = fit_ets(&series, &EtsSpec::fixed(c)).unwrap();
        assert_eq!(fit.label(), "ETS(A,Ad,N)");
        let phi = fit.params().phi.unwrap();
        assert!((PHI_BOUNDS.0..=PHI_BOUNDS.1).contains(&phi));
        let beta = fit.params().beta.unwrap();
        assert!(beta <= fit.params().alpha);
    }

    #[test]
    fn non_positive_data_excludes_multiplicative() {
        let mut values = seasonal_series(40);
        values[5] = -1.0;
        let fit = fit_ets(&quarterly(values), &EtsSpec::default()).unwrap();
        assert!(!fit.components_selected().is_multiplicative_error());
        assert!(fit
            .candidate_scores()
            .iter()
            .all(|(c, _)| !c.is_multiplicative_error() && !c.is_multiplicative_season()));
    }

    #[test]
    fn inadmissible_fixed_structure_reports_attempts() {
        let c = EtsComponents::new(
            ErrorType::Multiplicative,
            TrendType::None,
            SeasonalType::None,
        );
        let mut values = seasonal_series(30);
        values[0] = 0.0;
        match fit_ets(&quarterly(values), &EtsSpec::fixed(c)) {
            Err(FableError::FitFailure { model, attempts }) => {
                assert_eq!(model, "ETS");
                assert_eq!(attempts.len(), 1);
                assert_eq!(attempts[0].candidate, "ETS(M,N,N)");
            }
            other => panic!("expected FitFailure, got {:?}", other),
        }
    }

    #[test]
    fn constant_series_is_degenerate() {
        let series = quarterly(vec![5.0; 20]);
        let fit = fit_ets(&series, &EtsSpec::default()).unwrap();
        assert_eq!(fit.label(), "ETS(A,N,N)");
        assert_eq!(fit.sigma2(), 0.0);
        assert!(fit.fitted().iter().all(|f| *f == 5.0));

        let zero = quarterly(vec![0.0; 20]);
        let mnn = EtsSpec::default().with_error(ErrorType::Multiplicative);
        assert!(matches!(
            fit_ets(&zero, &mnn),
            Err(FableError::FitFailure { .. })
        ));
    }

    #[test]
    fn too_short_series() {
        assert!(matches!(
            fit_ets(&quarterly(vec![1.0, 2.0]), &EtsSpec::default()),
            Err(FableError::InsufficientData { .. })
        ));
    }

    #[test]
    fn seasonal_states_are_estimated_and_normalised() {
        let series = quarterly(seasonal_series(48));
        for season in [SeasonalType::Additive, SeasonalType::Multiplicative] {
            let c = EtsComponents::new(ErrorType::Multiplicative, TrendType::Additive, season);
            let init = initial_state(series.values(), &c, 4).unwrap();
            let fit = fit_ets(&series, &EtsSpec::fixed(c)).unwrap();
            let states = &fit.initial_state().season;
            assert_eq!(states.len(), 4);
            let target = if c.is_multiplicative_season() { 4.0 } else { 0.0 };
            assert_abs_diff_eq!(states.iter().sum::<f64>(), target, epsilon = 1e-9);
            let moved = states
                .iter()
                .zip(&init.season)
                .any(|(a, b)| (a - b).abs() > 1e-6);
            assert!(moved, "{} kept its heuristic seasonal states", c);
        }
    }

    #[test]
    fn unpacked_season_honours_the_constraint() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::None, SeasonalType::Additive);
        let template = EtsState {
            level: 10.0,
            slope: 0.0,
            season: vec![0.0; 4],
        };
        let (params, state) = unpack(&c, &[0.3, 0.2, 11.0, 1.0, -2.0, 0.5], &template);
        assert_abs_diff_eq!(params.gamma.unwrap(), 0.7 * 0.2, epsilon = 1e-12);
        assert_eq!(state.level, 11.0);
        assert_eq!(state.season, vec![1.0, -2.0, 0.5, 0.5]);
    }

    #[test]
    fn gaps_are_filled_by_one_step_predictions() {
        let mut values = seasonal_series(40);
        values[0] = f64::NAN;
        values[17] = f64::NAN;
        values[39] = f64::NAN;
        let fit = fit_ets(&quarterly(values), &EtsSpec::default()).unwrap();
        assert_eq!(fit.glance().nobs, 37);
        let filled = fit.interpolate().unwrap();
        assert!(filled.values().iter().all(|v| v.is_finite()));
        assert_eq!(filled.values()[17], fit.fitted()[17]);
        let dists = fit.forecast(4, &Default::default()).unwrap();
        assert!(dists.iter().all(|d| d.mean().is_finite()));
    }

    #[test]
    fn iteration_cap_fails_the_candidate() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::Additive, SeasonalType::None);
        let spec = EtsSpec::fixed(c).with_max_iter(1);
        match fit_ets(&quarterly(seasonal_series(40)), &spec) {
            Err(FableError::FitFailure { attempts, .. }) => {
                assert_eq!(attempts.len(), 1);
                assert!(attempts[0].reason.contains("max_iter"), "{}", attempts[0].reason);
            }
            other => panic!("expected FitFailure, got {:?}", other),
        }
    }

    #[test]
    fn short_series_skips_seasonal_candidates() {
        let series = quarterly(seasonal_series(7));
        let fit = fit_ets(&series, &EtsSpec::default().with_error(ErrorType::Additive)).unwrap();
        assert!(!fit.components_selected().has_season());
    }
}
