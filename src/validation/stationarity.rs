//! Unit-root testing used to choose differencing orders.

use crate::features::seasonal_strength;

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (interpolated from the critical value table)
    pub p_value: f64,
    /// Number of lags in the long-run variance estimate
    pub lags: usize,
    /// Whether stationarity is retained at the 5% level
    pub is_stationary: bool,
    pub critical_values: CriticalValues,
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Default)]
pub struct CriticalValues {
    pub cv_1pct: f64,
    pub cv_5pct: f64,
    pub cv_10pct: f64,
}

/// KPSS test of level stationarity.
///
/// The null hypothesis is stationarity, so a large statistic indicates a
/// unit root. Missing values are dropped before testing. The default lag
/// truncation is `floor(4 (n / 100)^(1/4))`.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> StationarityResult {
    let series: Vec<f64> = series.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = series.len();

    if n < 4 {
        return StationarityResult {
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            is_stationary: false,
            critical_values: CriticalValues::default(),
        };
    }

    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize)
        .clamp(1, n / 2);

    let mean = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|x| x - mean).collect();

    let partial_sums = residuals.iter().scan(0.0, |acc, r| {
        *acc += r;
        Some(*acc)
    });
    let numerator = partial_sums.map(|s| s * s).sum::<f64>() / (n * n) as f64;

    // Bartlett-weighted long-run variance
    let mut long_run = residuals.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocov = residuals[j..]
            .iter()
            .zip(&residuals)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run += 2.0 * weight * autocov;
    }

    let critical_values = CriticalValues {
        cv_1pct: 0.739,
        cv_5pct: 0.463,
        cv_10pct: 0.347,
    };

    if long_run <= 1e-12 * (1.0 + mean.abs()) {
        // Constant series: trivially stationary.
        return StationarityResult {
            statistic: 0.0,
            p_value: 1.0,
            lags,
            is_stationary: true,
            critical_values,
        };
    }

    let statistic = numerator / long_run;
    StationarityResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
        is_stationary: statistic < critical_values.cv_5pct,
        critical_values,
    }
}

fn kpss_p_value(stat: f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    if stat < 0.347 {
        0.10 + 0.90 * (1.0 - stat / 0.347)
    } else if stat < 0.463 {
        0.05 + 0.05 * (0.463 - stat) / (0.463 - 0.347)
    } else if stat < 0.739 {
        0.01 + 0.04 * (0.739 - stat) / (0.739 - 0.463)
    } else {
        0.01 * (1.0 - (stat - 0.739).min(1.0))
    }
}

/// Number of first differences needed for KPSS stationarity at 5%.
///
/// Differences repeatedly while the test rejects, up to `max_d`.
pub fn ndiffs(series: &[f64], max_d: usize) -> usize {
    let mut current: Vec<f64> = series.to_vec();
    let mut d = 0;
    while d < max_d {
        let result = kpss_test(&current, None);
        if result.statistic.is_nan() || result.is_stationary {
            break;
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
        d += 1;
    }
    d
}

/// Seasonal differencing order from seasonal strength.
///
/// One seasonal difference is taken while the strength of seasonality
/// exceeds 0.64 and at least two full periods would remain, up to `max_sd`.
pub fn nsdiffs(series: &[f64], period: usize, max_sd: usize) -> usize {
    if period <= 1 {
        return 0;
    }
    let mut current: Vec<f64> = series.to_vec();
    let mut sd = 0;
    while sd < max_sd && current.len() >= 2 * period + period {
        if seasonal_strength(&current, period) <= 0.64 {
            break;
        }
        current = current[period..]
            .iter()
            .zip(&current)
            .map(|(a, b)| a - b)
            .collect();
        sd += 1;
    }
    sd
}
