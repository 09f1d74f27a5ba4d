//! Specifications of the benchmark families.

use super::{auto_count, bad_value, unknown_option, Auto, ModelFamily, OptionValue};
use crate::error::{FableError, Result};
use serde::{Deserialize, Serialize};

/// Historical mean forecast. Takes no options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeanSpec;

/// Naive forecast (last value), optionally a random walk with drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NaiveSpec {
    pub drift: bool,
}

impl NaiveSpec {
    pub fn with_drift() -> Self {
        Self { drift: true }
    }

    pub(crate) fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        match (name, value) {
            ("drift", OptionValue::Bool(b)) => self.drift = *b,
            ("drift", other) => return Err(bad_value(ModelFamily::Naive, name, other, "a boolean")),
            _ => return Err(unknown_option(ModelFamily::Naive, name)),
        }
        Ok(())
    }
}

/// Seasonal naive forecast (value one season ago).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonalNaiveSpec {
    pub period: Auto<usize>,
}

impl SeasonalNaiveSpec {
    pub fn with_period(period: usize) -> Self {
        Self {
            period: Auto::Fixed(period),
        }
    }

    pub(crate) fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        match name {
            "period" => self.period = auto_count(ModelFamily::SeasonalNaive, name, value)?,
            _ => return Err(unknown_option(ModelFamily::SeasonalNaive, name)),
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Auto::Fixed(0) = self.period {
            return Err(FableError::InvalidSpec(
                "SNAIVE period must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
