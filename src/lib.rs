//! # fable-forecast
//!
//! Tidy forecasting over many keyed time series.
//!
//! Automatic ETS and ARIMA fitters, plus mean, naive and seasonal naive
//! benchmarks, are applied uniformly across every series of a
//! [`GroupedSeries`](core::GroupedSeries) to build a model table
//! ([`Mable`](table::Mable)). Forecasting a mable yields a forecast table
//! ([`Fable`](table::Fable)) whose rows carry full predictive
//! distributions.
//!
//! Failures stay local: a cell that cannot be fitted is recorded in the
//! table and every other cell is still fitted and forecast.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod distribution;
pub mod error;
pub mod features;
pub mod models;
pub mod spec;
pub mod table;
pub mod utils;
pub mod validation;

pub use error::{FableError, Result};

pub mod prelude {
    pub use crate::config::{ForecastOptions, MableConfig, RefitOptions};
    pub use crate::core::{GroupedSeries, Horizon, Interval, SeriesKey, TimeSeries};
    pub use crate::distribution::{Distribution, Hilo};
    pub use crate::error::{FableError, FailedCandidate, Result};
    pub use crate::models::{FittedModel, ModelFit};
    pub use crate::spec::{
        ArimaLimits, ArimaSpec, Auto, EtsSpec, ErrorType, MeanSpec, ModelFamily, ModelSpec,
        NaiveSpec, OptionValue, SearchStrategy, SeasonalNaiveSpec, SeasonalType,
        SelectionCriterion, TrendType,
    };
    pub use crate::table::{Extraction, Fable, Mable};
}
