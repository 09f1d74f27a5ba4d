//! Stationarity testing and differencing-order selection.
//!
//! # Example
//!
//! ```
//! use fable_forecast::validation::{kpss_test, ndiffs};
//!
//! let trend: Vec<f64> = (0..120).map(|i| i as f64).collect();
//! assert!(!kpss_test(&trend, None).is_stationary);
//! assert!(ndiffs(&trend, 2) >= 1);
//! ```

pub mod stationarity;

pub use stationarity::{kpss_test, ndiffs, nsdiffs, CriticalValues, StationarityResult};
