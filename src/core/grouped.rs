//! Keyed collections of series: the input container for model tables.

use crate::core::interval::Interval;
use crate::core::time_series::TimeSeries;
use crate::error::{FableError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// Ordered tuple of grouping values identifying one series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey(Vec<String>);

impl SeriesKey {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for SeriesKey {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A set of uniquely keyed regular series sharing key column names.
///
/// Series are iterated in key order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupedSeries {
    key_names: Vec<String>,
    series: BTreeMap<SeriesKey, TimeSeries>,
}

impl GroupedSeries {
    pub fn new<I, S>(key_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_names: key_names.into_iter().map(Into::into).collect(),
            series: BTreeMap::new(),
        }
    }

    /// Add one series. Keys must be unique and match the key column count.
    pub fn insert(&mut self, key: SeriesKey, series: TimeSeries) -> Result<()> {
        if key.arity() != self.key_names.len() {
            return Err(FableError::DimensionMismatch {
                expected: self.key_names.len(),
                got: key.arity(),
            });
        }
        match self.series.entry(key) {
            Entry::Occupied(entry) => Err(FableError::InvalidParameter(format!(
                "duplicate series key `{}`",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(series);
                Ok(())
            }
        }
    }

    pub fn with_series(mut self, key: SeriesKey, series: TimeSeries) -> Result<Self> {
        self.insert(key, series)?;
        Ok(self)
    }

    /// Build from long-format rows `(key, timestamp, value)` in any order.
    ///
    /// Each key's rows are sorted by time and must form a gap-free index at
    /// `interval` (inferred per series when `None`); duplicated time points
    /// are rejected with `IrregularSeries`.
    pub fn from_rows<I, S, R>(key_names: I, rows: R, interval: Option<Interval>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = (SeriesKey, DateTime<Utc>, f64)>,
    {
        let mut grouped = Self::new(key_names);
        let mut buckets: BTreeMap<SeriesKey, Vec<(DateTime<Utc>, f64)>> = BTreeMap::new();
        for (key, ts, value) in rows {
            buckets.entry(key).or_default().push((ts, value));
        }
        for (key, mut obs) in buckets {
            obs.sort_by_key(|(ts, _)| *ts);
            if obs.windows(2).any(|w| w[0].0 == w[1].0) {
                return Err(FableError::IrregularSeries(format!(
                    "series `{}` has duplicated time points",
                    key
                )));
            }
            let (timestamps, values): (Vec<_>, Vec<_>) = obs.into_iter().unzip();
            let series = match interval {
                Some(interval) => TimeSeries::new(timestamps, values, interval),
                None => TimeSeries::univariate(timestamps, values),
            }
            .map_err(|e| match e {
                FableError::IrregularSeries(msg) => {
                    FableError::IrregularSeries(format!("series `{}`: {}", key, msg))
                }
                other => other,
            })?;
            grouped.insert(key, series)?;
        }
        Ok(grouped)
    }

    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&TimeSeries> {
        self.series.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &TimeSeries)> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Keep only series whose key satisfies the predicate.
    pub fn filter<F>(&self, mut predicate: F) -> GroupedSeries
    where
        F: FnMut(&SeriesKey) -> bool,
    {
        GroupedSeries {
            key_names: self.key_names.clone(),
            series: self
                .series
                .iter()
                .filter(|(k, _)| predicate(k))
                .map(|(k, s)| (k.clone(), s.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quarter(year: i32, q: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 3 * (q - 1) + 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn from_rows_groups_and_sorts() {
        let rows = vec![
            (SeriesKey::from("b"), quarter(2020, 2), 2.0),
            (SeriesKey::from("a"), quarter(2020, 1), 1.0),
            (SeriesKey::from("b"), quarter(2020, 1), 1.5),
            (SeriesKey::from("a"), quarter(2020, 2), 3.0),
            (SeriesKey::from("a"), quarter(2020, 3), 4.0),
        ];
        let grouped = GroupedSeries::from_rows(["purpose"], rows, None).unwrap();
        assert_eq!(grouped.len(), 2);
        let a = grouped.get(&SeriesKey::from("a")).unwrap();
        assert_eq!(a.values(), &[1.0, 3.0, 4.0]);
        assert_eq!(a.interval(), Interval::quarters(1));
        let keys: Vec<_> = grouped.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn from_rows_rejects_gaps_and_duplicates() {
        let gap = vec![
            (SeriesKey::from("a"), quarter(2020, 1), 1.0),
            (SeriesKey::from("a"), quarter(2020, 2), 1.0),
            (SeriesKey::from("a"), quarter(2020, 4), 1.0),
        ];
        let err = GroupedSeries::from_rows(["k"], gap, Some(Interval::quarters(1))).unwrap_err();
        assert!(matches!(err, FableError::IrregularSeries(_)));

        let dup = vec![
            (SeriesKey::from("a"), quarter(2020, 1), 1.0),
            (SeriesKey::from("a"), quarter(2020, 1), 2.0),
        ];
        let err = GroupedSeries::from_rows(["k"], dup, None).unwrap_err();
        assert!(matches!(err, FableError::IrregularSeries(_)));
    }

    #[test]
    fn insert_rejects_duplicate_keys_and_wrong_arity() {
        let series =
            TimeSeries::regular(quarter(2020, 1), Interval::quarters(1), vec![1.0, 2.0]).unwrap();
        let mut grouped = GroupedSeries::new(["region", "purpose"]);
        let key = SeriesKey::new(["north", "business"]);
        grouped.insert(key.clone(), series.clone()).unwrap();
        assert!(grouped.insert(key, series.clone()).is_err());
        assert!(grouped.insert(SeriesKey::from("x"), series).is_err());
    }

    #[test]
    fn builder_chains_series() {
        let series =
            TimeSeries::regular(quarter(2020, 1), Interval::quarters(1), vec![1.0, 2.0]).unwrap();
        let grouped = GroupedSeries::new(["state"])
            .with_series(SeriesKey::from("vic"), series.clone())
            .and_then(|g| g.with_series(SeriesKey::from("nsw"), series.clone()))
            .unwrap();
        assert_eq!(grouped.len(), 2);
        let again = grouped.with_series(SeriesKey::from("vic"), series);
        assert!(matches!(again, Err(FableError::InvalidParameter(_))));
    }
}
