//! Forecast tables: `h` rows per (series key, model) with the full
//! predictive distribution of each step.

use crate::config::ForecastOptions;
use crate::core::{GroupedSeries, Horizon, SeriesKey};
use crate::distribution::{Distribution, Hilo};
use crate::error::{FableError, Result};
use crate::models::FittedModel;
use crate::table::mable::{run_cells, AccuracyRow, Cell, CellFailure, Extraction, Mable};
use crate::utils::metrics::{accuracy, AccuracyMeasures};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info_span, warn};

/// One forecast step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FableRow {
    pub key: SeriesKey,
    pub model: String,
    /// Steps ahead, starting at 1.
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    /// Mean of the distribution.
    pub point: f64,
    pub distribution: Distribution,
}

/// Why a (key, model) pair has no forecast rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub key: SeriesKey,
    pub model: String,
    pub reason: String,
    pub error: FableError,
}

/// A forecast row with intervals unpacked at the requested levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiloRow {
    pub key: SeriesKey,
    pub model: String,
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    pub point: f64,
    /// One interval per requested level, in request order.
    pub intervals: Vec<Hilo>,
}

/// A table of forecast distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct Fable {
    key_names: Vec<String>,
    model_names: Vec<String>,
    rows: Vec<FableRow>,
    diagnostics: Vec<Diagnostic>,
}

fn forecast_cell(
    key: &SeriesKey,
    name: &str,
    model: &FittedModel,
    horizon: Horizon,
    options: &ForecastOptions,
) -> Result<Vec<FableRow>> {
    let dists = model.forecast(horizon, options)?;
    let timestamps = model.series().future_timestamps(dists.len())?;
    Ok(dists
        .into_iter()
        .zip(timestamps)
        .enumerate()
        .map(|(i, (distribution, timestamp))| FableRow {
            key: key.clone(),
            model: name.to_string(),
            step: i + 1,
            timestamp,
            point: distribution.mean(),
            distribution,
        })
        .collect())
}

/// Accuracy of one (key, model) group of forecast rows.
fn measure(
    key: &SeriesKey,
    rows: &[&FableRow],
    actual: &GroupedSeries,
    training: &GroupedSeries,
) -> Result<AccuracyMeasures> {
    let missing = |what: &str| FableError::InvalidParameter(format!("no {} data for key {}", what, key));
    let observed = actual.get(key).ok_or_else(|| missing("actual"))?;
    let train = training.get(key).ok_or_else(|| missing("training"))?;
    let lookup: HashMap<DateTime<Utc>, f64> = observed
        .timestamps()
        .iter()
        .copied()
        .zip(observed.values().iter().copied())
        .collect();
    let (truth, predicted): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| lookup.get(&r.timestamp).map(|a| (*a, r.point)))
        .unzip();
    accuracy(&truth, &predicted, train.values(), train.seasonal_period())
}

impl Fable {
    /// Forecast every fitted cell of `mable` over `horizon`.
    ///
    /// Rows are ordered by key, then model column, then step, with
    /// timestamps continuing each training series. Failed cells, and cells
    /// whose forecast fails, are recorded as diagnostics. With a seed, each
    /// cell's sample paths use the seed offset by the cell's position.
    pub fn from_mable(mable: &Mable, horizon: Horizon, options: &ForecastOptions) -> Fable {
        let span = info_span!("fable_forecast", series = mable.len(), models = mable.model_names().len());
        let _guard = span.enter();

        let cells: Vec<(usize, (&SeriesKey, &str, &Cell))> = mable.cells().enumerate().collect();
        let results = run_cells(mable.config().parallel, cells, |(i, (key, name, cell))| {
            let model = match cell {
                Cell::Fitted(m) => m,
                Cell::Failed(f) => return Err(f.clone()),
            };
            let mut cell_options = *options;
            cell_options.seed = options.seed.map(|s| s.wrapping_add(i as u64));
            forecast_cell(key, name, model, horizon, &cell_options).map_err(|error| {
                warn!(key = %key, model = name, error = %error, "forecast failed");
                CellFailure {
                    key: key.clone(),
                    model: name.to_string(),
                    error,
                }
            })
        });

        let mut rows = Vec::new();
        let mut diagnostics = Vec::new();
        for result in results {
            match result {
                Ok(mut r) => rows.append(&mut r),
                Err(f) => diagnostics.push(Diagnostic {
                    reason: f.error.to_string(),
                    key: f.key,
                    model: f.model,
                    error: f.error,
                }),
            }
        }
        Fable {
            key_names: mable.key_names().to_vec(),
            model_names: mable.model_names().to_vec(),
            rows,
            diagnostics,
        }
    }

    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    pub fn model_names(&self) -> &[String] {
        &self.model_names
    }

    pub fn rows(&self) -> &[FableRow] {
        &self.rows
    }

    pub fn rows_for<'a>(&'a self, key: &'a SeriesKey, model: &'a str) -> impl Iterator<Item = &'a FableRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| &r.key == key && r.model == model)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Prediction intervals of every row at each of `levels` (percentages).
    ///
    /// # Errors
    ///
    /// [`FableError::InvalidParameter`] when a level is outside (0, 100).
    pub fn hilo(&self, levels: &[f64]) -> Result<Vec<HiloRow>> {
        self.rows
            .iter()
            .map(|r| {
                Ok(HiloRow {
                    key: r.key.clone(),
                    model: r.model.clone(),
                    step: r.step,
                    timestamp: r.timestamp,
                    point: r.point,
                    intervals: r.distribution.hilo(levels)?,
                })
            })
            .collect()
    }

    /// Out-of-sample accuracy of the point forecasts against `actual`,
    /// scaled by the seasonal naive errors of `training`.
    ///
    /// Forecast timestamps without an actual value are skipped; pairs with
    /// no actual or training data are listed as failures.
    pub fn accuracy(&self, actual: &GroupedSeries, training: &GroupedSeries) -> Extraction<AccuracyRow> {
        let mut groups: Vec<((&SeriesKey, &str), Vec<&FableRow>)> = Vec::new();
        for row in &self.rows {
            match groups.last_mut() {
                Some(((k, m), rows)) if *k == &row.key && *m == row.model => {
                    rows.push(row);
                    continue;
                }
                _ => {}
            }
            groups.push(((&row.key, row.model.as_str()), vec![row]));
        }

        let mut out = Extraction {
            rows: Vec::new(),
            failures: Vec::new(),
        };
        for ((key, model), rows) in groups {
            let measured = measure(key, &rows, actual, training);
            match measured {
                Ok(measures) => out.rows.push(AccuracyRow {
                    key: key.clone(),
                    model: model.to_string(),
                    measures,
                }),
                Err(error) => out.failures.push(CellFailure {
                    key: key.clone(),
                    model: model.to_string(),
                    error,
                }),
            }
        }
        for d in &self.diagnostics {
            out.failures.push(CellFailure {
                key: d.key.clone(),
                model: d.model.clone(),
                error: d.error.clone(),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MableConfig;
    use crate::core::{Interval, TimeSeries};
    use crate::spec::{EtsSpec, MeanSpec, ModelSpec, NaiveSpec};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn monthly(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2021, 11, 1, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Interval::months(1), values).unwrap()
    }

    fn mable() -> Mable {
        let mut data = GroupedSeries::new(["id"]);
        data.insert(SeriesKey::from("a"), monthly(vec![5.0, 6.0, 7.0, 6.0, 8.0, 9.0]))
            .unwrap();
        data.insert(SeriesKey::from("b"), monthly(vec![1.0, 2.0, 3.0, 2.0])).unwrap();
        let specs = [
            ("mean", ModelSpec::Mean(MeanSpec)),
            ("naive", ModelSpec::Naive(NaiveSpec::default())),
            ("ets", ModelSpec::Ets(EtsSpec::default())),
        ];
        Mable::fit(&data, &specs, &MableConfig::sequential()).unwrap()
    }

    #[test]
    fn rows_continue_the_calendar() {
        let fable = mable().forecast(Horizon::Steps(3), &ForecastOptions::default());
        let key = SeriesKey::from("a");
        let rows: Vec<&FableRow> = fable.rows_for(&key, "naive").collect();
        assert_eq!(rows.len(), 3);
        let expected = [
            Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap(),
        ];
        for (row, ts) in rows.iter().zip(expected) {
            assert_eq!(row.timestamp, ts);
            assert_relative_eq!(row.point, 9.0);
        }
        assert_eq!(rows.iter().map(|r| r.step).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn failed_cells_become_diagnostics() {
        let fable = mable().forecast(Horizon::Steps(2), &ForecastOptions::default());
        let b = SeriesKey::from("b");
        assert!(fable.diagnostics().iter().any(|d| d.key == b && d.model == "ets"));
        assert_eq!(fable.rows_for(&b, "ets").count(), 0);
        assert_eq!(fable.rows_for(&b, "mean").count(), 2);
        assert_eq!(fable.len() + 2 * fable.diagnostics().len(), 2 * 3 * 2);
    }

    #[test]
    fn hilo_keeps_level_order_and_nesting() {
        let fable = mable().forecast(Horizon::Steps(2), &ForecastOptions::default());
        let rows = fable.hilo(&[95.0, 80.0]).unwrap();
        for row in rows {
            assert_eq!(row.intervals[0].level, 95.0);
            assert_eq!(row.intervals[1].level, 80.0);
            assert!(row.intervals[0].lower <= row.intervals[1].lower);
            assert!(row.intervals[0].upper >= row.intervals[1].upper);
        }
        assert!(fable.hilo(&[100.0]).is_err());
    }

    #[test]
    fn out_of_sample_accuracy() {
        let m = mable().select(&["naive"]).unwrap();
        let fable = m.forecast(Horizon::Steps(2), &ForecastOptions::default());
        let mut training = GroupedSeries::new(["id"]);
        training
            .insert(SeriesKey::from("a"), monthly(vec![5.0, 6.0, 7.0, 6.0, 8.0, 9.0]))
            .unwrap();
        let mut actual = GroupedSeries::new(["id"]);
        let future = Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap();
        actual
            .insert(
                SeriesKey::from("a"),
                TimeSeries::regular(future, Interval::months(1), vec![10.0, 11.0]).unwrap(),
            )
            .unwrap();

        let acc = fable.accuracy(&actual, &training);
        assert_eq!(acc.rows.len(), 1);
        assert_relative_eq!(acc.rows[0].measures.me, 1.5);
        assert_relative_eq!(acc.rows[0].measures.mae, 1.5);
        // Key "b" has neither actual nor training data.
        assert_eq!(acc.failures.len(), 1);
    }
}
