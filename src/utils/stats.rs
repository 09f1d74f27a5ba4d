//! Statistical helper functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile of the standard normal distribution.
///
/// # Example
/// ```
/// use fable_forecast::utils::quantile_normal;
///
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(n) => n.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Mean of the non-NaN entries.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample variance (n - 1 denominator) of the non-NaN entries.
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    let (ss, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + (v - m).powi(2), n + 1));
    if n < 2 {
        f64::NAN
    } else {
        ss / (n - 1) as f64
    }
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Median of the non-NaN entries.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Sample autocorrelation at `lag`, skipping pairs with a missing value.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if values.len() <= lag {
        return f64::NAN;
    }
    let m = mean(values);
    let denominator: f64 = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - m).powi(2))
        .sum();
    if denominator == 0.0 {
        return 0.0;
    }
    let numerator: f64 = values[lag..]
        .iter()
        .zip(values)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    numerator / denominator
}

/// Information criteria for a fitted likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InformationCriteria {
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
}

/// AIC, AICc and BIC for log-likelihood `log_lik` with `k` estimated
/// parameters and `n` observations. AICc is infinite when `n <= k + 1`.
pub fn information_criteria(log_lik: f64, k: usize, n: usize) -> InformationCriteria {
    let (kf, nf) = (k as f64, n as f64);
    let aic = -2.0 * log_lik + 2.0 * kf;
    let aicc = if n > k + 1 {
        aic + 2.0 * kf * (kf + 1.0) / (nf - kf - 1.0)
    } else {
        f64::INFINITY
    };
    let bic = -2.0 * log_lik + kf * nf.ln();
    InformationCriteria { aic, aicc, bic }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-12);
        assert_relative_eq!(quantile_normal(0.9), 1.281_551_6, epsilon = 1e-6);
        assert_relative_eq!(quantile_normal(0.025), -1.959_964, epsilon = 1e-6);
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn moments_skip_missing_values() {
        let values = [1.0, f64::NAN, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&values), 3.0);
        assert_relative_eq!(variance(&values), 2.5);
        assert_relative_eq!(std_dev(&values), 2.5_f64.sqrt());
        assert_relative_eq!(median(&values), 3.0);
        assert!(mean(&[f64::NAN]).is_nan());
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn autocorrelation_of_a_trend_is_high() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_relative_eq!(autocorrelation(&values, 0), 1.0, epsilon = 1e-12);
        assert!(autocorrelation(&values, 1) > 0.8);
    }

    #[test]
    fn criteria_formulae() {
        let ic = information_criteria(-100.0, 3, 50);
        assert_relative_eq!(ic.aic, 206.0);
        assert_relative_eq!(ic.aicc, 206.0 + 24.0 / 46.0, epsilon = 1e-12);
        assert_relative_eq!(ic.bic, 200.0 + 3.0 * 50f64.ln(), epsilon = 1e-12);
        assert!(information_criteria(-1.0, 4, 5).aicc.is_infinite());
    }
}
