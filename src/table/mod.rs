//! Model and forecast tables over many keyed series.

pub mod fable;
pub mod mable;

pub use fable::{Diagnostic, Fable, FableRow, HiloRow};
pub use mable::{
    AccuracyRow, AugmentRow, Cell, CellFailure, CoefficientRow, Extraction, GlanceRow,
    InterpolatedSeries, Mable, SimulationRow,
};
