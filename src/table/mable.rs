//! Model tables: one row per series key, one column per model
//! specification, each cell a fitted model or the failure that replaced it.

use crate::config::{ForecastOptions, MableConfig, RefitOptions};
use crate::core::{GroupedSeries, Horizon, SeriesKey, TimeSeries};
use crate::error::{FableError, Result};
use crate::models::{Components, FittedModel, Glance};
use crate::spec::ModelSpec;
use crate::table::fable::Fable;
use crate::utils::metrics::{accuracy, AccuracyMeasures};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info_span, warn};

/// A cell whose model could not be fitted, refitted or streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    pub key: SeriesKey,
    pub model: String,
    pub error: FableError,
}

/// Contents of one mable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Fitted(FittedModel),
    Failed(CellFailure),
}

impl Cell {
    pub fn model(&self) -> Option<&FittedModel> {
        match self {
            Cell::Fitted(m) => Some(m),
            Cell::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&CellFailure> {
        match self {
            Cell::Fitted(_) => None,
            Cell::Failed(f) => Some(f),
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Cell::Fitted(_))
    }
}

/// Rows extracted from the fitted cells, with the cells that produced none
/// because they failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub rows: Vec<T>,
    pub failures: Vec<CellFailure>,
}

impl<T> Extraction<T> {
    fn collect(results: Vec<std::result::Result<Vec<T>, CellFailure>>) -> Self {
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(mut r) => rows.append(&mut r),
                Err(f) => failures.push(f),
            }
        }
        Self { rows, failures }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    pub key: SeriesKey,
    pub model: String,
    pub term: String,
    pub estimate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlanceRow {
    pub key: SeriesKey,
    pub model: String,
    /// Selected structure, e.g. `ETS(A,N,N)`.
    pub label: String,
    pub glance: Glance,
}

/// Fitted values and residuals per observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentRow {
    pub key: SeriesKey,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub fitted: f64,
    pub residual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyRow {
    pub key: SeriesKey,
    pub model: String,
    pub measures: AccuracyMeasures,
}

/// One value of a simulated future path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRow {
    pub key: SeriesKey,
    pub model: String,
    pub path: usize,
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A training series with its gaps filled by one model.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedSeries {
    pub key: SeriesKey,
    pub model: String,
    pub series: TimeSeries,
}

/// A table of fitted models.
///
/// Mables are values: every operation returns a new table and leaves the
/// original untouched.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fable_forecast::prelude::*;
///
/// let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
/// let values: Vec<f64> = (0..24).map(|i| 10.0 + (i % 4) as f64).collect();
/// let mut data = GroupedSeries::new(["store"]);
/// data.insert(
///     SeriesKey::from("a"),
///     TimeSeries::regular(start, Interval::quarters(1), values).unwrap(),
/// )
/// .unwrap();
///
/// let specs = [
///     ("naive", ModelSpec::Naive(NaiveSpec::default())),
///     ("snaive", ModelSpec::SeasonalNaive(SeasonalNaiveSpec::default())),
/// ];
/// let mable = Mable::fit(&data, &specs, &MableConfig::default()).unwrap();
/// assert_eq!(mable.n_cells(), 2);
/// assert!(mable.failures().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mable {
    key_names: Vec<String>,
    model_names: Vec<String>,
    rows: BTreeMap<SeriesKey, Vec<Cell>>,
    config: MableConfig,
}

/// Run `f` over `items`, on the rayon pool when `parallel`.
pub(crate) fn run_cells<I, T, F>(parallel: bool, items: Vec<I>, f: F) -> Vec<T>
where
    I: Send,
    T: Send,
    F: Fn(I) -> T + Sync + Send,
{
    if parallel {
        items.into_par_iter().map(f).collect()
    } else {
        items.into_iter().map(f).collect()
    }
}

fn log_failure(failure: &CellFailure, action: &str) {
    warn!(
        key = %failure.key,
        model = %failure.model,
        kind = failure.error.kind(),
        error = %failure.error,
        "{} failed",
        action
    );
}

impl Mable {
    /// Fit every specification to every series.
    ///
    /// A cell that cannot be fitted holds a [`CellFailure`]; the other cells
    /// are unaffected.
    ///
    /// # Errors
    ///
    /// [`FableError::InvalidSpec`] when two specifications share a name.
    pub fn fit<S: AsRef<str> + Sync>(
        data: &GroupedSeries,
        specs: &[(S, ModelSpec)],
        config: &MableConfig,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for (name, _) in specs {
            if !seen.insert(name.as_ref()) {
                return Err(FableError::InvalidSpec(format!(
                    "duplicate model name '{}'",
                    name.as_ref()
                )));
            }
        }
        let model_names: Vec<String> = specs.iter().map(|(n, _)| n.as_ref().to_string()).collect();

        let span = info_span!("mable_fit", series = data.len(), models = specs.len());
        let _guard = span.enter();

        let jobs: Vec<(&SeriesKey, &TimeSeries, usize)> = data
            .iter()
            .flat_map(|(key, series)| (0..specs.len()).map(move |j| (key, series, j)))
            .collect();
        let cells = run_cells(config.parallel, jobs, |(key, series, j)| {
            let cell = match FittedModel::fit(&specs[j].1, series) {
                Ok(model) => {
                    debug!(key = %key, model = %model_names[j], label = %model.label(), "fitted cell");
                    Cell::Fitted(model)
                }
                Err(error) => {
                    let failure = CellFailure {
                        key: key.clone(),
                        model: model_names[j].clone(),
                        error,
                    };
                    log_failure(&failure, "fit");
                    Cell::Failed(failure)
                }
            };
            (key.clone(), cell)
        });

        let mut rows: BTreeMap<SeriesKey, Vec<Cell>> =
            data.keys().map(|k| (k.clone(), Vec::new())).collect();
        for (key, cell) in cells {
            rows.entry(key).or_default().push(cell);
        }
        Ok(Self {
            key_names: data.key_names().to_vec(),
            model_names,
            rows,
            config: *config,
        })
    }

    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    pub fn model_names(&self) -> &[String] {
        &self.model_names
    }

    pub fn config(&self) -> &MableConfig {
        &self.config
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.rows.keys()
    }

    /// Number of rows (series keys).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_cells(&self) -> usize {
        self.rows.len() * self.model_names.len()
    }

    pub fn cell(&self, key: &SeriesKey, model: &str) -> Option<&Cell> {
        let j = self.model_names.iter().position(|m| m == model)?;
        self.rows.get(key).and_then(|cells| cells.get(j))
    }

    pub fn model(&self, key: &SeriesKey, model: &str) -> Option<&FittedModel> {
        self.cell(key, model).and_then(Cell::model)
    }

    /// Every cell in key order, then model order.
    pub fn cells(&self) -> impl Iterator<Item = (&SeriesKey, &str, &Cell)> {
        self.rows.iter().flat_map(move |(key, cells)| {
            self.model_names
                .iter()
                .zip(cells)
                .map(move |(name, cell)| (key, name.as_str(), cell))
        })
    }

    pub fn failures(&self) -> Vec<&CellFailure> {
        self.cells().filter_map(|(_, _, c)| c.failure()).collect()
    }

    /// Apply `f` to every fitted cell, collecting its rows; failed cells and
    /// cells where `f` fails are listed instead.
    fn extract<T, F>(&self, f: F) -> Extraction<T>
    where
        T: Send,
        F: Fn(&SeriesKey, &str, &FittedModel) -> Result<Vec<T>> + Sync + Send,
    {
        let cells: Vec<(&SeriesKey, &str, &Cell)> = self.cells().collect();
        let results = run_cells(self.config.parallel, cells, |(key, name, cell)| match cell {
            Cell::Failed(failure) => Err(failure.clone()),
            Cell::Fitted(model) => f(key, name, model).map_err(|error| CellFailure {
                key: key.clone(),
                model: name.to_string(),
                error,
            }),
        });
        Extraction::collect(results)
    }

    /// Estimated coefficients of every fitted cell.
    pub fn coefficients(&self) -> Extraction<CoefficientRow> {
        self.extract(|key, name, model| {
            Ok(model
                .coefficients()
                .into_iter()
                .map(|c| CoefficientRow {
                    key: key.clone(),
                    model: name.to_string(),
                    term: c.term,
                    estimate: c.estimate,
                })
                .collect())
        })
    }

    /// One summary row per fitted cell.
    pub fn glance(&self) -> Extraction<GlanceRow> {
        self.extract(|key, name, model| {
            Ok(vec![GlanceRow {
                key: key.clone(),
                model: name.to_string(),
                label: model.label(),
                glance: model.glance(),
            }])
        })
    }

    /// Fitted values and residuals per observation.
    pub fn augment(&self) -> Extraction<AugmentRow> {
        self.extract(|key, name, model| {
            let series = model.series();
            let residuals = model.residuals();
            Ok(series
                .timestamps()
                .iter()
                .zip(series.values())
                .zip(model.fitted().iter().zip(&residuals))
                .map(|((ts, value), (fitted, residual))| AugmentRow {
                    key: key.clone(),
                    model: name.to_string(),
                    timestamp: *ts,
                    value: *value,
                    fitted: *fitted,
                    residual: *residual,
                })
                .collect())
        })
    }

    /// In-sample accuracy of the one-step fitted values, scaled by the
    /// seasonal naive errors of each training series.
    pub fn accuracy(&self) -> Extraction<AccuracyRow> {
        self.extract(|key, name, model| {
            let series = model.series();
            let measures = accuracy(
                series.values(),
                model.fitted(),
                series.values(),
                series.seasonal_period(),
            )?;
            Ok(vec![AccuracyRow {
                key: key.clone(),
                model: name.to_string(),
                measures,
            }])
        })
    }

    /// Latent-state decomposition of one cell.
    pub fn components(&self, key: &SeriesKey, model: &str) -> Result<Components> {
        match self.cell(key, model) {
            Some(Cell::Fitted(m)) => Ok(m.components()),
            Some(Cell::Failed(f)) => Err(f.error.clone()),
            None => Err(FableError::InvalidParameter(format!(
                "no cell for key {} and model '{}'",
                key, model
            ))),
        }
    }

    /// Rows whose key satisfies `predicate`. Cells are shared, not refitted.
    pub fn filter<F>(&self, mut predicate: F) -> Mable
    where
        F: FnMut(&SeriesKey) -> bool,
    {
        Mable {
            rows: self
                .rows
                .iter()
                .filter(|(k, _)| predicate(k))
                .map(|(k, c)| (k.clone(), c.clone()))
                .collect(),
            ..self.clone_header()
        }
    }

    /// The named model columns, in the given order.
    ///
    /// # Errors
    ///
    /// [`FableError::InvalidParameter`] for a name that is not a column.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Mable> {
        let indices = names
            .iter()
            .map(|n| {
                self.model_names
                    .iter()
                    .position(|m| m == n.as_ref())
                    .ok_or_else(|| {
                        FableError::InvalidParameter(format!("no model column '{}'", n.as_ref()))
                    })
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Mable {
            key_names: self.key_names.clone(),
            model_names: indices.iter().map(|&j| self.model_names[j].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|(k, cells)| (k.clone(), indices.iter().map(|&j| cells[j].clone()).collect()))
                .collect(),
            config: self.config,
        })
    }

    /// Same keys and columns, with no cells.
    fn clone_header(&self) -> Mable {
        Mable {
            key_names: self.key_names.clone(),
            model_names: self.model_names.clone(),
            rows: self.rows.keys().map(|k| (k.clone(), Vec::new())).collect(),
            config: self.config,
        }
    }

    /// Apply each fitted model's structure to the matching series of `data`.
    ///
    /// Failed cells stay failed. Rows without a series in `data` become
    /// refit failures.
    pub fn refit(&self, data: &GroupedSeries, options: &RefitOptions) -> Mable {
        let span = info_span!("mable_refit", series = data.len(), reestimate = options.reestimate);
        let _guard = span.enter();

        let cells: Vec<(&SeriesKey, &str, &Cell)> = self.cells().collect();
        let refitted = run_cells(self.config.parallel, cells, |(key, name, cell)| {
            let cell = match cell {
                Cell::Failed(_) => cell.clone(),
                Cell::Fitted(model) => {
                    let result = data
                        .get(key)
                        .ok_or_else(|| FableError::Refit(format!("no new data for key {}", key)))
                        .and_then(|series| model.refit(series, options));
                    match result {
                        Ok(m) => Cell::Fitted(m),
                        Err(error) => {
                            let failure = CellFailure {
                                key: key.clone(),
                                model: name.to_string(),
                                error,
                            };
                            log_failure(&failure, "refit");
                            Cell::Failed(failure)
                        }
                    }
                }
            };
            (key.clone(), cell)
        });
        self.rebuild(refitted)
    }

    /// Extend every fitted cell with the new observations for its key.
    /// Rows without new data are unchanged; failed cells stay failed.
    pub fn stream(self, data: &GroupedSeries) -> Mable {
        let span = info_span!("mable_stream", series = data.len());
        let _guard = span.enter();

        let header = self.clone_header();
        let parallel = self.config.parallel;
        let names = self.model_names.clone();
        let cells: Vec<(SeriesKey, String, Cell)> = self
            .rows
            .into_iter()
            .flat_map(|(key, cells)| {
                names
                    .clone()
                    .into_iter()
                    .zip(cells)
                    .map(move |(name, cell)| (key.clone(), name, cell))
            })
            .collect();
        let streamed = run_cells(parallel, cells, |(key, name, cell)| {
            let cell = match (cell, data.get(&key)) {
                (Cell::Fitted(model), Some(new_data)) => match model.stream(new_data) {
                    Ok(m) => Cell::Fitted(m),
                    Err(error) => {
                        let failure = CellFailure {
                            key: key.clone(),
                            model: name,
                            error,
                        };
                        log_failure(&failure, "stream");
                        Cell::Failed(failure)
                    }
                },
                (cell, _) => cell,
            };
            (key, cell)
        });
        header.rebuild(streamed)
    }

    fn rebuild(&self, cells: Vec<(SeriesKey, Cell)>) -> Mable {
        let mut header = self.clone_header();
        for (key, cell) in cells {
            header.rows.entry(key).or_default().push(cell);
        }
        header
    }

    /// `n_paths` simulated future paths of length `h` per fitted cell.
    ///
    /// Each cell draws from its own generator seeded with `seed` plus the
    /// cell's position, so results do not depend on scheduling.
    pub fn generate(&self, h: usize, n_paths: usize, seed: u64, bootstrap: bool) -> Extraction<SimulationRow> {
        let positions: HashMap<(SeriesKey, String), u64> = self
            .cells()
            .enumerate()
            .map(|(i, (k, n, _))| ((k.clone(), n.to_string()), i as u64))
            .collect();
        self.extract(|key, name, model| {
            let offset = positions
                .get(&(key.clone(), name.to_string()))
                .copied()
                .unwrap_or(0);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(offset));
            let paths = model.generate(h, n_paths, &mut rng, bootstrap)?;
            let timestamps = model.series().future_timestamps(h)?;
            Ok(paths
                .iter()
                .enumerate()
                .flat_map(|(p, path)| {
                    path.iter()
                        .zip(&timestamps)
                        .enumerate()
                        .map(move |(s, (value, ts))| SimulationRow {
                            key: key.clone(),
                            model: name.to_string(),
                            path: p + 1,
                            step: s + 1,
                            timestamp: *ts,
                            value: *value,
                        })
                })
                .collect())
        })
    }

    /// Training series with missing values filled by each fitted model.
    pub fn interpolate(&self) -> Extraction<InterpolatedSeries> {
        self.extract(|key, name, model| {
            Ok(vec![InterpolatedSeries {
                key: key.clone(),
                model: name.to_string(),
                series: model.interpolate()?,
            }])
        })
    }

    /// Forecast every fitted cell; see [`Fable::from_mable`].
    pub fn forecast(&self, horizon: Horizon, options: &ForecastOptions) -> Fable {
        Fable::from_mable(self, horizon, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::spec::{EtsSpec, MeanSpec, NaiveSpec, SeasonalNaiveSpec};
    use chrono::TimeZone;

    fn data() -> GroupedSeries {
        let start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let mut g = GroupedSeries::new(["region"]);
        let seasonal: Vec<f64> = (0..24).map(|i| 20.0 + [3.0, -1.0, 2.0, -4.0][i % 4] + i as f64 * 0.2).collect();
        g.insert(
            SeriesKey::from("north"),
            TimeSeries::regular(start, Interval::quarters(1), seasonal).unwrap(),
        )
        .unwrap();
        g.insert(
            SeriesKey::from("south"),
            TimeSeries::regular(start, Interval::quarters(1), vec![7.0, 9.0, f64::NAN, 8.0, 10.0]).unwrap(),
        )
        .unwrap();
        g
    }

    fn specs() -> Vec<(&'static str, ModelSpec)> {
        vec![
            ("mean", ModelSpec::Mean(MeanSpec)),
            ("naive", ModelSpec::Naive(NaiveSpec::default())),
            ("snaive", ModelSpec::SeasonalNaive(SeasonalNaiveSpec::default())),
        ]
    }

    #[test]
    fn one_failing_cell_leaves_the_others() {
        let mut specs = specs();
        specs.push(("ets", ModelSpec::Ets(EtsSpec::default())));
        let mable = Mable::fit(&data(), &specs, &MableConfig::default()).unwrap();
        assert_eq!(mable.len(), 2);
        assert_eq!(mable.n_cells(), 8);

        // Five points with one gap are too few for ETS.
        let south = SeriesKey::from("south");
        let failures = mable.failures();
        assert!(failures.iter().any(|f| f.key == south && f.model == "ets"));
        assert!(mable.model(&SeriesKey::from("north"), "ets").is_some());
        assert!(mable.model(&south, "mean").is_some());

        let glance = mable.glance();
        assert_eq!(glance.rows.len() + glance.failures.len(), 8);
        assert_eq!(glance.failures.len(), failures.len());
    }

    #[test]
    fn no_models_still_lists_every_key() {
        let empty: Vec<(&str, ModelSpec)> = Vec::new();
        let mable = Mable::fit(&data(), &empty, &MableConfig::default().with_parallel(false)).unwrap();
        assert_eq!(mable.len(), 2);
        assert_eq!(mable.n_cells(), 0);
        assert!(mable.glance().rows.is_empty());

        let north = SeriesKey::from("north");
        assert_eq!(mable.filter(|k| k == &north).len(), 1);
        assert_eq!(mable.clone().stream(&data()).len(), 2);
        assert_eq!(mable.refit(&data(), &RefitOptions::default()).len(), 2);
    }

    #[test]
    fn cells_report_their_outcome() {
        let mut specs = specs();
        specs.push(("ets", ModelSpec::Ets(EtsSpec::default())));
        let mable = Mable::fit(&data(), &specs, &MableConfig::sequential()).unwrap();
        let south = SeriesKey::from("south");
        let ets = mable.cell(&south, "ets").unwrap();
        assert!(!ets.is_fitted());
        assert!(ets.failure().is_some());
        assert!(mable.cell(&south, "naive").unwrap().is_fitted());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let specs = [("m", ModelSpec::Mean(MeanSpec)), ("m", ModelSpec::Mean(MeanSpec))];
        let err = Mable::fit(&data(), &specs, &MableConfig::default()).unwrap_err();
        assert!(matches!(err, FableError::InvalidSpec(_)));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let a = Mable::fit(&data(), &specs(), &MableConfig::default()).unwrap();
        let b = Mable::fit(&data(), &specs(), &MableConfig::sequential()).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn filter_and_select_keep_cells() {
        let mable = Mable::fit(&data(), &specs(), &MableConfig::sequential()).unwrap();
        let north = SeriesKey::from("north");
        let only_north = mable.filter(|k| k == &north);
        assert_eq!(only_north.len(), 1);
        assert_eq!(only_north.cell(&north, "naive"), mable.cell(&north, "naive"));

        let selected = mable.select(&["snaive", "mean"]).unwrap();
        assert_eq!(selected.model_names(), &["snaive".to_string(), "mean".to_string()]);
        assert_eq!(selected.cell(&north, "mean"), mable.cell(&north, "mean"));
        assert!(mable.select(&["arima"]).is_err());
    }

    #[test]
    fn augment_and_coefficients() {
        let mable = Mable::fit(&data(), &specs(), &MableConfig::sequential()).unwrap();
        let augment = mable.augment();
        assert_eq!(augment.rows.len(), 3 * (24 + 5));
        let coefs = mable.coefficients();
        assert_eq!(coefs.rows.iter().filter(|r| r.term == "mean").count(), 2);
        assert!(coefs.failures.is_empty());
    }

    #[test]
    fn interpolate_fills_gaps() {
        let mable = Mable::fit(&data(), &specs(), &MableConfig::sequential()).unwrap();
        let filled = mable.interpolate();
        for row in &filled.rows {
            assert!(row.series.values().iter().all(|v| !v.is_nan()));
        }
        let south_naive = filled
            .rows
            .iter()
            .find(|r| r.key == SeriesKey::from("south") && r.model == "naive")
            .unwrap();
        assert_eq!(south_naive.series.values(), &[7.0, 9.0, 9.0, 8.0, 10.0]);
    }

    #[test]
    fn generate_is_reproducible() {
        let mable = Mable::fit(&data(), &specs(), &MableConfig::default()).unwrap();
        let a = mable.generate(4, 3, 42, false);
        let b = mable.generate(4, 3, 42, false);
        assert_eq!(a, b);
        assert!(a.failures.is_empty());
        assert_eq!(a.rows.len(), 2 * 3 * 3 * 4);
        assert!(a.rows.iter().all(|r| r.step >= 1 && r.step <= 4));
    }

    #[test]
    fn stream_and_refit_follow_keys() {
        let full = data();
        let north = SeriesKey::from("north");
        let series = full.get(&north).unwrap();
        let mut head = GroupedSeries::new(["region"]);
        head.insert(north.clone(), series.head(20)).unwrap();
        let mut tail = GroupedSeries::new(["region"]);
        tail.insert(north.clone(), series.tail_from(20)).unwrap();

        let mable = Mable::fit(&head, &specs(), &MableConfig::sequential()).unwrap();
        let streamed = mable.clone().stream(&tail);
        assert_eq!(streamed.model(&north, "naive").unwrap().series().len(), 24);

        let refitted = mable.refit(&full, &RefitOptions::reestimate());
        assert_eq!(refitted.model(&north, "mean").unwrap().series().len(), 24);

        let empty = GroupedSeries::new(["region"]);
        let orphaned = mable.refit(&empty, &RefitOptions::default());
        assert_eq!(orphaned.failures().len(), 3);
    }
}
