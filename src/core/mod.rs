//! Core data structures: regular time series, keys and horizons.

mod grouped;
mod interval;
mod time_series;

pub use grouped::{GroupedSeries, SeriesKey};
pub use interval::{Horizon, Interval, IntervalUnit};
pub use time_series::TimeSeries;
