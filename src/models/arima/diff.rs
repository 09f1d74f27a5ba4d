//! Differencing utilities for ARIMA models.

use super::params::poly_mul;

/// Apply `d` first differences.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `d` seasonal differences at lag `period`.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Coefficients of `(1 - B)^d (1 - B^m)^D`, leading one included.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Apply a differencing polynomial, keeping the original alignment: the
/// first `poly.len() - 1` positions are `NaN`.
pub fn apply_differencing(series: &[f64], poly: &[f64]) -> Vec<f64> {
    let lag = poly.len().saturating_sub(1);
    (0..series.len())
        .map(|t| {
            if t < lag {
                f64::NAN
            } else {
                poly.iter().enumerate().map(|(k, c)| c * series[t - k]).sum()
            }
        })
        .collect()
}

/// Invert a differencing polynomial over a forecast horizon: each future
/// level is `z_t - sum_k delta_k y_(t-k)`, seeded with `history`.
pub fn integrate(history: &[f64], differenced: &[f64], poly: &[f64]) -> Vec<f64> {
    let mut levels = history.to_vec();
    let start = levels.len();
    for &z in differenced {
        let t = levels.len();
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| if k <= t { c * levels[t - k] } else { 0.0 })
            .sum();
        levels.push(z - carried);
    }
    levels.split_off(start)
}
