//! Seasonal ARIMA models with automatic order selection.
//!
//! Estimation maximises the exact Gaussian likelihood from a Kalman filter
//! over the differenced series.

mod auto;
mod diff;
mod kalman;
mod model;
mod params;

pub use auto::fit_arima;
pub use diff::{apply_differencing, difference, differencing_polynomial, integrate, seasonal_difference};
pub use model::{ArimaCoefficients, ArimaFit, ArimaOrder};
