//! Benchmark models: historical mean, naive (optionally with drift) and
//! seasonal naive.
//!
//! None of these has a likelihood; their glance reports the residual
//! variance and leaves the information criteria empty.

mod mean;
mod naive;
mod seasonal_naive;

pub use mean::{fit_mean, MeanFit};
pub use naive::{fit_naive, NaiveFit};
pub use seasonal_naive::{fit_seasonal_naive, SeasonalNaiveFit};

use crate::core::TimeSeries;
use crate::error::{FableError, Result};

/// `fitted` extended by `new_data`, which must start one interval after it.
pub(crate) fn continue_series(fitted: &TimeSeries, new_data: &TimeSeries) -> Result<TimeSeries> {
    if !fitted.is_continued_by(new_data) {
        return Err(FableError::Stream(format!(
            "new observations starting at {:?} do not continue the series ending at {:?}",
            new_data.start(),
            fitted.end()
        )));
    }
    fitted
        .append(new_data)
        .map_err(|e| FableError::Stream(e.to_string()))
}

pub(crate) fn check_interval(fitted: &TimeSeries, series: &TimeSeries) -> Result<()> {
    if series.interval() != fitted.interval() {
        return Err(FableError::Refit(format!(
            "series interval {} differs from the fitted interval {}",
            series.interval(),
            fitted.interval()
        )));
    }
    Ok(())
}

/// Mean squared residual with `lost` degrees of freedom removed, or `None`
/// when no degrees of freedom remain.
pub(crate) fn residual_variance(values: &[f64], fitted: &[f64], lost: usize) -> Option<f64> {
    let (sse, n) = values
        .iter()
        .zip(fitted)
        .map(|(y, f)| y - f)
        .filter(|r| r.is_finite())
        .fold((0.0, 0usize), |(s, n), r| (s + r * r, n + 1));
    (n > lost).then(|| sse / (n - lost) as f64)
}
