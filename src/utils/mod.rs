//! Numerical utilities shared by the fitters.

pub mod metrics;
pub mod optimization;
pub mod stats;

pub use metrics::{accuracy, AccuracyMeasures};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{information_criteria, quantile_normal, InformationCriteria};
