//! Sampling intervals of regular time indexes and forecast horizons.

use crate::error::{FableError, Result};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of a sampling interval.
///
/// Units up to `Week` are fixed lengths of elapsed time; `Month`, `Quarter`
/// and `Year` are calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl IntervalUnit {
    fn seconds(self) -> Option<i64> {
        match self {
            IntervalUnit::Second => Some(1),
            IntervalUnit::Minute => Some(60),
            IntervalUnit::Hour => Some(3_600),
            IntervalUnit::Day => Some(86_400),
            IntervalUnit::Week => Some(604_800),
            _ => None,
        }
    }

    fn months(self) -> Option<u32> {
        match self {
            IntervalUnit::Month => Some(1),
            IntervalUnit::Quarter => Some(3),
            IntervalUnit::Year => Some(12),
            _ => None,
        }
    }

    /// Number of observations in one natural seasonal cycle at unit step.
    fn cycle(self) -> u32 {
        match self {
            IntervalUnit::Second | IntervalUnit::Minute => 60,
            IntervalUnit::Hour => 24,
            IntervalUnit::Day => 7,
            IntervalUnit::Week => 52,
            IntervalUnit::Month => 12,
            IntervalUnit::Quarter => 4,
            IntervalUnit::Year => 1,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            IntervalUnit::Second => "s",
            IntervalUnit::Minute => "min",
            IntervalUnit::Hour => "h",
            IntervalUnit::Day => "D",
            IntervalUnit::Week => "W",
            IntervalUnit::Month => "M",
            IntervalUnit::Quarter => "Q",
            IntervalUnit::Year => "Y",
        }
    }
}

/// Uniform spacing between consecutive observations: `step` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub unit: IntervalUnit,
    pub step: u32,
}

impl Interval {
    pub fn new(unit: IntervalUnit, step: u32) -> Result<Self> {
        if step == 0 {
            return Err(FableError::InvalidParameter(
                "interval step must be positive".to_string(),
            ));
        }
        Ok(Self { unit, step })
    }

    pub fn seconds(step: u32) -> Self {
        Self { unit: IntervalUnit::Second, step: step.max(1) }
    }

    pub fn minutes(step: u32) -> Self {
        Self { unit: IntervalUnit::Minute, step: step.max(1) }
    }

    pub fn hours(step: u32) -> Self {
        Self { unit: IntervalUnit::Hour, step: step.max(1) }
    }

    pub fn days(step: u32) -> Self {
        Self { unit: IntervalUnit::Day, step: step.max(1) }
    }

    pub fn weeks(step: u32) -> Self {
        Self { unit: IntervalUnit::Week, step: step.max(1) }
    }

    pub fn months(step: u32) -> Self {
        Self { unit: IntervalUnit::Month, step: step.max(1) }
    }

    pub fn quarters(step: u32) -> Self {
        Self { unit: IntervalUnit::Quarter, step: step.max(1) }
    }

    pub fn years(step: u32) -> Self {
        Self { unit: IntervalUnit::Year, step: step.max(1) }
    }

    /// Whether the interval is measured in calendar months.
    pub fn is_calendar(&self) -> bool {
        self.unit.months().is_some()
    }

    fn total_seconds(&self) -> Option<i64> {
        self.unit.seconds().map(|s| s * self.step as i64)
    }

    fn total_months(&self) -> Option<u32> {
        self.unit.months().map(|m| m * self.step)
    }

    /// The timestamp `k` intervals after `anchor`.
    ///
    /// Calendar steps are always measured from the anchor, so month-end
    /// anchors do not drift.
    pub fn advance(&self, anchor: DateTime<Utc>, k: i64) -> Result<DateTime<Utc>> {
        let overflow = || FableError::ComputationError("timestamp out of range".to_string());
        if let Some(secs) = self.total_seconds() {
            let delta = Duration::try_seconds(secs.checked_mul(k).ok_or_else(overflow)?)
                .ok_or_else(overflow)?;
            return anchor.checked_add_signed(delta).ok_or_else(overflow);
        }
        let months = self.total_months().unwrap_or(1) as i64 * k;
        let shift = Months::new(months.unsigned_abs().try_into().map_err(|_| overflow())?);
        if months >= 0 {
            anchor.checked_add_months(shift).ok_or_else(overflow)
        } else {
            anchor.checked_sub_months(shift).ok_or_else(overflow)
        }
    }

    /// Default seasonal period implied by the interval (quarterly 4,
    /// monthly 12, daily 7, ...). Steps that do not divide the natural cycle
    /// are treated as non-seasonal.
    pub fn default_period(&self) -> usize {
        let cycle = self.unit.cycle();
        if cycle % self.step == 0 {
            (cycle / self.step) as usize
        } else {
            1
        }
    }

    /// Infer the interval from the first two timestamps.
    ///
    /// Calendar units are preferred when the second timestamp is a whole
    /// number of calendar months after the first.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Result<Self> {
        if timestamps.len() < 2 {
            return Err(FableError::IrregularSeries(
                "at least two timestamps are needed to infer the interval".to_string(),
            ));
        }
        let (a, b) = (timestamps[0], timestamps[1]);
        if b <= a {
            return Err(FableError::IrregularSeries(
                "timestamps must be strictly increasing".to_string(),
            ));
        }

        let month_gap = (b.year() - a.year()) * 12 + b.month() as i32 - a.month() as i32;
        if month_gap > 0 && a.checked_add_months(Months::new(month_gap as u32)) == Some(b) {
            let m = month_gap as u32;
            return Ok(if m % 12 == 0 {
                Self::years(m / 12)
            } else if m % 3 == 0 {
                Self::quarters(m / 3)
            } else {
                Self::months(m)
            });
        }

        let secs = (b - a).num_seconds();
        for unit in [
            IntervalUnit::Week,
            IntervalUnit::Day,
            IntervalUnit::Hour,
            IntervalUnit::Minute,
            IntervalUnit::Second,
        ] {
            let width = unit.seconds().unwrap_or(1);
            if secs % width == 0 {
                return Self::new(unit, (secs / width) as u32);
            }
        }
        Err(FableError::IrregularSeries(format!(
            "cannot infer an interval from a gap of {} seconds",
            secs
        )))
    }

    /// Number of whole intervals contained in `span`.
    pub fn steps_in(&self, span: &Interval) -> Result<usize> {
        let ratio = match (self.total_months(), span.total_months()) {
            (Some(own), Some(other)) => (other % own == 0).then(|| (other / own) as usize),
            (None, None) => {
                let own = self.total_seconds().unwrap_or(1);
                let other = span.total_seconds().unwrap_or(0);
                (other % own == 0).then(|| (other / own) as usize)
            }
            _ => None,
        };
        ratio.ok_or_else(|| {
            FableError::InvalidParameter(format!(
                "horizon of {} is not a whole number of {} steps",
                span, self
            ))
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.step, self.unit.suffix())
    }
}

/// Forecast horizon: a number of steps or a calendar span resolved against
/// the series interval (e.g. "5 years" on quarterly data is 20 steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    Steps(usize),
    Span(Interval),
}

impl Horizon {
    pub fn resolve(&self, interval: &Interval) -> Result<usize> {
        match self {
            Horizon::Steps(h) => Ok(*h),
            Horizon::Span(span) => interval.steps_in(span),
        }
    }
}

impl From<usize> for Horizon {
    fn from(h: usize) -> Self {
        Horizon::Steps(h)
    }
}
