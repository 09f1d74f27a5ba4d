//! Regular, univariate time series with an explicit sampling interval.

use crate::core::interval::Interval;
use crate::error::{FableError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A univariate series observed on a gap-free regular time index.
///
/// Missing observations are represented by `NaN`: the time point exists but
/// the value is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    interval: Interval,
}

impl TimeSeries {
    /// Create a series, validating that `timestamps` advance by exactly one
    /// `interval` per observation.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
        interval: Interval,
    ) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(FableError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(FableError::InvalidParameter(
                "series values must be finite or NaN".to_string(),
            ));
        }
        if let Some(&anchor) = timestamps.first() {
            for (i, &ts) in timestamps.iter().enumerate().skip(1) {
                let expected = interval.advance(anchor, i as i64)?;
                if ts != expected {
                    return Err(FableError::IrregularSeries(format!(
                        "observation {} at {} breaks the {} index (expected {})",
                        i, ts, interval, expected
                    )));
                }
            }
        }
        Ok(Self {
            timestamps,
            values,
            interval,
        })
    }

    /// Create a series from timestamps, inferring the interval from the
    /// first gap.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        let interval = Interval::infer(&timestamps)?;
        Self::new(timestamps, values, interval)
    }

    /// Create a series starting at `start` with one value per interval.
    pub fn regular(start: DateTime<Utc>, interval: Interval, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len())
            .map(|i| interval.advance(start, i as i64))
            .collect::<Result<Vec<_>>>()?;
        Self::new(timestamps, values, interval)
    }

    /// An empty series on the given interval.
    pub fn empty(interval: Interval) -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
            interval,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Default seasonal period implied by the interval.
    pub fn seasonal_period(&self) -> usize {
        self.interval.default_period()
    }

    /// Number of non-missing observations.
    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Observed values with missing entries dropped.
    pub fn observed(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| !v.is_nan()).collect()
    }

    /// The `h` timestamps immediately following the last observation.
    pub fn future_timestamps(&self, h: usize) -> Result<Vec<DateTime<Utc>>> {
        let anchor = self.end().ok_or(FableError::EmptyData)?;
        (1..=h as i64)
            .map(|k| self.interval.advance(anchor, k))
            .collect()
    }

    /// Whether `next` starts exactly one interval after this series ends.
    pub fn is_continued_by(&self, next: &TimeSeries) -> bool {
        if next.interval != self.interval {
            return false;
        }
        match (self.end(), next.start()) {
            (Some(end), Some(start)) => self.interval.advance(end, 1).ok() == Some(start),
            (_, None) => true,
            (None, Some(_)) => true,
        }
    }

    /// Concatenate a continuation onto this series.
    pub fn append(&self, next: &TimeSeries) -> Result<TimeSeries> {
        if !self.is_continued_by(next) {
            return Err(FableError::IrregularSeries(format!(
                "series starting at {:?} does not continue the {} index ending at {:?}",
                next.start(),
                self.interval,
                self.end()
            )));
        }
        let mut timestamps = self.timestamps.clone();
        timestamps.extend_from_slice(&next.timestamps);
        let mut values = self.values.clone();
        values.extend_from_slice(&next.values);
        Ok(TimeSeries {
            timestamps,
            values,
            interval: self.interval,
        })
    }

    /// Same index, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<TimeSeries> {
        if values.len() != self.len() {
            return Err(FableError::DimensionMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            interval: self.interval,
        })
    }

    /// The first `n` observations.
    pub fn head(&self, n: usize) -> TimeSeries {
        let n = n.min(self.len());
        TimeSeries {
            timestamps: self.timestamps[..n].to_vec(),
            values: self.values[..n].to_vec(),
            interval: self.interval,
        }
    }

    /// Observations from position `n` onward.
    pub fn tail_from(&self, n: usize) -> TimeSeries {
        let n = n.min(self.len());
        TimeSeries {
            timestamps: self.timestamps[n..].to_vec(),
            values: self.values[n..].to_vec(),
            interval: self.interval,
        }
    }
}
