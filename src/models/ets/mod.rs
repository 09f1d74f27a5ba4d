//! Exponential smoothing state space models (ETS).
//!
//! Each model is named `ETS(error, trend, season)`; [`fit_ets`] fits every
//! admissible combination allowed by an [`EtsSpec`](crate::spec::EtsSpec)
//! and keeps the best by information criterion.

mod auto;
mod model;

pub use auto::fit_ets;
pub use model::{EtsFit, EtsParams, EtsState};
