//! Point accuracy measures for fitted values and forecasts.

use crate::error::{FableError, Result};
use crate::utils::stats::autocorrelation;
use serde::Serialize;

/// Point forecast accuracy measures.
///
/// Percentage measures are `None` when an actual value is zero; scaled
/// measures are `None` when the training data are too short or constant at
/// the seasonal lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyMeasures {
    /// Mean error
    pub me: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean percentage error
    pub mpe: Option<f64>,
    /// Mean absolute percentage error
    pub mape: Option<f64>,
    /// Mean absolute scaled error
    pub mase: Option<f64>,
    /// Root mean squared scaled error
    pub rmsse: Option<f64>,
    /// Lag-1 autocorrelation of the errors
    pub acf1: f64,
}

/// Compute accuracy measures of `predicted` against `actual`.
///
/// Pairs with a missing value on either side are skipped. Scaled measures
/// divide by the in-sample errors of a seasonal naive forecast (lag
/// `period`, 1 for non-seasonal data) on `training`.
///
/// # Example
/// ```
/// use fable_forecast::utils::accuracy;
///
/// let actual = [10.0, 12.0, 11.0, 13.0];
/// let predicted = [11.0, 11.0, 12.0, 12.0];
/// let m = accuracy(&actual, &predicted, &actual, 1).unwrap();
/// assert_eq!(m.mae, 1.0);
/// ```
pub fn accuracy(
    actual: &[f64],
    predicted: &[f64],
    training: &[f64],
    period: usize,
) -> Result<AccuracyMeasures> {
    if actual.len() != predicted.len() {
        return Err(FableError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    let pairs: Vec<(f64, f64)> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| !a.is_nan() && !p.is_nan())
        .map(|(a, p)| (*a, *p))
        .collect();
    if pairs.is_empty() {
        return Err(FableError::EmptyData);
    }

    let n = pairs.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| a - p)
        .collect();

    let me = pairs.iter().map(|(a, p)| a - p).sum::<f64>() / n;
    let mse = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;

    let (mpe, mape) = if pairs.iter().any(|(a, _)| *a == 0.0) {
        (None, None)
    } else {
        let pe: Vec<f64> = pairs.iter().map(|(a, p)| 100.0 * (a - p) / a).collect();
        (
            Some(pe.iter().sum::<f64>() / n),
            Some(pe.iter().map(|x| x.abs()).sum::<f64>() / n),
        )
    };

    let scale = naive_scale(training, period.max(1));
    let mase = scale.map(|(abs, _)| mae / abs);
    let rmsse = scale.map(|(_, sq)| (mse / sq).sqrt());

    Ok(AccuracyMeasures {
        me,
        rmse: mse.sqrt(),
        mae,
        mpe,
        mape,
        mase,
        rmsse,
        acf1: autocorrelation(&errors, 1),
    })
}

/// Mean absolute and mean squared seasonal-naive errors of `training`.
fn naive_scale(training: &[f64], lag: usize) -> Option<(f64, f64)> {
    let lag = if training.len() > lag { lag } else { 1 };
    let diffs: Vec<f64> = training
        .iter()
        .skip(lag)
        .zip(training)
        .map(|(cur, prev)| cur - prev)
        .filter(|d| !d.is_nan())
        .collect();
    if diffs.is_empty() {
        return None;
    }
    let m = diffs.len() as f64;
    let abs = diffs.iter().map(|d| d.abs()).sum::<f64>() / m;
    let sq = diffs.iter().map(|d| d * d).sum::<f64>() / m;
    (abs > 0.0).then_some((abs, sq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_prediction() {
        let actual = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = accuracy(&actual, &actual, &actual, 1).unwrap();
        assert_relative_eq!(m.me, 0.0);
        assert_relative_eq!(m.rmse, 0.0);
        assert_relative_eq!(m.mape.unwrap(), 0.0);
        assert_relative_eq!(m.mase.unwrap(), 0.0);
    }

    #[test]
    fn known_values() {
        let actual = [10.0, 20.0, 30.0, 40.0];
        let predicted = [12.0, 18.0, 33.0, 40.0];
        let m = accuracy(&actual, &predicted, &actual, 1).unwrap();
        assert_relative_eq!(m.me, (-2.0 + 2.0 - 3.0 + 0.0) / 4.0);
        assert_relative_eq!(m.mae, 7.0 / 4.0);
        assert_relative_eq!(m.rmse, (17.0f64 / 4.0).sqrt());
        assert_relative_eq!(m.mape.unwrap(), 100.0 * (0.2 + 0.1 + 0.1) / 4.0, epsilon = 1e-12);
        // naive errors are all 10
        assert_relative_eq!(m.mase.unwrap(), 7.0 / 40.0);
        assert_relative_eq!(m.rmsse.unwrap(), (17.0f64 / 4.0 / 100.0).sqrt());
    }

    #[test]
    fn zeros_disable_percentage_measures() {
        let m = accuracy(&[0.0, 1.0], &[0.5, 1.0], &[0.0, 1.0, 2.0], 1).unwrap();
        assert!(m.mape.is_none());
        assert!(m.mpe.is_none());
        assert!(m.mase.is_some());
    }

    #[test]
    fn missing_pairs_are_skipped() {
        let m = accuracy(&[1.0, f64::NAN, 3.0], &[2.0, 2.0, f64::NAN], &[1.0, 2.0, 3.0], 1).unwrap();
        assert_relative_eq!(m.mae, 1.0);
        assert!(accuracy(&[f64::NAN], &[1.0], &[1.0], 1).is_err());
        assert!(accuracy(&[1.0], &[1.0, 2.0], &[1.0], 1).is_err());
    }

    #[test]
    fn constant_training_has_no_scale() {
        let m = accuracy(&[1.0, 2.0], &[1.0, 1.0], &[5.0, 5.0, 5.0], 1).unwrap();
        assert!(m.mase.is_none());
        assert!(m.rmsse.is_none());
    }
}
