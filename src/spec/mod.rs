//! Unevaluated model specifications.
//!
//! A [`ModelSpec`] names a model family and the sub-options that constrain
//! its structural search. Every option is either fixed by the caller or left
//! to automatic selection through [`Auto`]. Specifications are immutable
//! values and can be applied to any number of series.
//!
//! # Example
//! ```
//! use fable_forecast::spec::{ModelFamily, ModelSpec, OptionValue};
//!
//! let spec = ModelSpec::from_options(
//!     ModelFamily::Arima,
//!     [("d", OptionValue::Int(1)), ("q", OptionValue::Auto)],
//! )
//! .unwrap();
//! assert_eq!(spec.family(), ModelFamily::Arima);
//!
//! let bad = ModelSpec::from_options(ModelFamily::Arima, [("p", OptionValue::Int(-1))]);
//! assert!(bad.is_err());
//! ```

mod arima;
mod baseline;
mod ets;

pub use arima::{ArimaLimits, ArimaSpec, SearchStrategy};
pub use baseline::{MeanSpec, NaiveSpec, SeasonalNaiveSpec};
pub use ets::{ErrorType, EtsComponents, EtsSpec, SeasonalType, TrendType};

use crate::error::{FableError, Result};
use crate::utils::stats::InformationCriteria;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An option that is either chosen automatically or fixed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Auto<T> {
    Auto,
    Fixed(T),
}

impl<T> Default for Auto<T> {
    fn default() -> Self {
        Auto::Auto
    }
}

impl<T> Auto<T> {
    pub fn is_auto(&self) -> bool {
        matches!(self, Auto::Auto)
    }

    pub fn fixed(&self) -> Option<&T> {
        match self {
            Auto::Auto => None,
            Auto::Fixed(value) => Some(value),
        }
    }
}

impl<T: Copy> Auto<T> {
    /// The fixed value, or `default` when automatic.
    pub fn or(&self, default: T) -> T {
        match self {
            Auto::Auto => default,
            Auto::Fixed(value) => *value,
        }
    }
}

impl<T> From<T> for Auto<T> {
    fn from(value: T) -> Self {
        Auto::Fixed(value)
    }
}

/// Information criterion used to rank candidates within one search.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionCriterion {
    AIC,
    #[default]
    AICc,
    BIC,
}

impl SelectionCriterion {
    /// The value of this criterion in `ic`.
    pub fn score(&self, ic: &InformationCriteria) -> f64 {
        match self {
            SelectionCriterion::AIC => ic.aic,
            SelectionCriterion::AICc => ic.aicc,
            SelectionCriterion::BIC => ic.bic,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "aic" => Some(SelectionCriterion::AIC),
            "aicc" => Some(SelectionCriterion::AICc),
            "bic" => Some(SelectionCriterion::BIC),
            _ => None,
        }
    }
}

/// Raw option value as produced by a formula front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Auto,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Auto => write!(f, "auto"),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Text(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// Closed set of supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    Ets,
    Arima,
    Mean,
    Naive,
    SeasonalNaive,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Ets => "ETS",
            ModelFamily::Arima => "ARIMA",
            ModelFamily::Mean => "MEAN",
            ModelFamily::Naive => "NAIVE",
            ModelFamily::SeasonalNaive => "SNAIVE",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A model family together with its (possibly automatic) sub-options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSpec {
    Ets(EtsSpec),
    Arima(ArimaSpec),
    Mean(MeanSpec),
    Naive(NaiveSpec),
    SeasonalNaive(SeasonalNaiveSpec),
}

impl ModelSpec {
    /// Build and validate a specification from a family tag and named options.
    pub fn from_options<I, S>(family: ModelFamily, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, OptionValue)>,
        S: AsRef<str>,
    {
        let mut spec = match family {
            ModelFamily::Ets => ModelSpec::Ets(EtsSpec::default()),
            ModelFamily::Arima => ModelSpec::Arima(ArimaSpec::default()),
            ModelFamily::Mean => ModelSpec::Mean(MeanSpec),
            ModelFamily::Naive => ModelSpec::Naive(NaiveSpec::default()),
            ModelFamily::SeasonalNaive => ModelSpec::SeasonalNaive(SeasonalNaiveSpec::default()),
        };
        for (name, value) in options {
            let name = name.as_ref();
            match &mut spec {
                ModelSpec::Ets(s) => s.set_option(name, &value)?,
                ModelSpec::Arima(s) => s.set_option(name, &value)?,
                ModelSpec::Mean(_) => return Err(unknown_option(family, name)),
                ModelSpec::Naive(s) => s.set_option(name, &value)?,
                ModelSpec::SeasonalNaive(s) => s.set_option(name, &value)?,
            }
        }
        spec.validate()?;
        Ok(spec)
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            ModelSpec::Ets(_) => ModelFamily::Ets,
            ModelSpec::Arima(_) => ModelFamily::Arima,
            ModelSpec::Mean(_) => ModelFamily::Mean,
            ModelSpec::Naive(_) => ModelFamily::Naive,
            ModelSpec::SeasonalNaive(_) => ModelFamily::SeasonalNaive,
        }
    }

    /// Check every fixed option against its legal domain.
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::Ets(s) => s.validate(),
            ModelSpec::Arima(s) => s.validate(),
            ModelSpec::Mean(_) | ModelSpec::Naive(_) => Ok(()),
            ModelSpec::SeasonalNaive(s) => s.validate(),
        }
    }
}

impl From<EtsSpec> for ModelSpec {
    fn from(spec: EtsSpec) -> Self {
        ModelSpec::Ets(spec)
    }
}

impl From<ArimaSpec> for ModelSpec {
    fn from(spec: ArimaSpec) -> Self {
        ModelSpec::Arima(spec)
    }
}

impl From<NaiveSpec> for ModelSpec {
    fn from(spec: NaiveSpec) -> Self {
        ModelSpec::Naive(spec)
    }
}

impl From<SeasonalNaiveSpec> for ModelSpec {
    fn from(spec: SeasonalNaiveSpec) -> Self {
        ModelSpec::SeasonalNaive(spec)
    }
}

impl From<MeanSpec> for ModelSpec {
    fn from(spec: MeanSpec) -> Self {
        ModelSpec::Mean(spec)
    }
}

pub(crate) fn unknown_option(family: ModelFamily, name: &str) -> FableError {
    FableError::InvalidSpec(format!("unknown option `{}` for {}", name, family))
}

pub(crate) fn bad_value(family: ModelFamily, name: &str, value: &OptionValue, want: &str) -> FableError {
    FableError::InvalidSpec(format!(
        "option `{}` for {} must be {}, got {}",
        name, family, want, value
    ))
}

/// Parse a non-negative integer option that may be automatic.
pub(crate) fn auto_count(family: ModelFamily, name: &str, value: &OptionValue) -> Result<Auto<usize>> {
    match value {
        OptionValue::Auto => Ok(Auto::Auto),
        OptionValue::Int(v) if *v >= 0 => Ok(Auto::Fixed(*v as usize)),
        other => Err(bad_value(family, name, other, "a non-negative integer or auto")),
    }
}

pub(crate) fn count(family: ModelFamily, name: &str, value: &OptionValue) -> Result<usize> {
    match value {
        OptionValue::Int(v) if *v >= 0 => Ok(*v as usize),
        other => Err(bad_value(family, name, other, "a non-negative integer")),
    }
}

pub(crate) fn criterion(family: ModelFamily, name: &str, value: &OptionValue) -> Result<SelectionCriterion> {
    match value {
        OptionValue::Text(text) => SelectionCriterion::parse(text)
            .ok_or_else(|| bad_value(family, name, value, "one of \"aic\", \"aicc\", \"bic\"")),
        other => Err(bad_value(family, name, other, "one of \"aic\", \"aicc\", \"bic\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_helpers() {
        let a: Auto<usize> = Auto::Auto;
        assert!(a.is_auto());
        assert_eq!(a.or(3), 3);
        let f: Auto<usize> = 2.into();
        assert_eq!(f.fixed(), Some(&2));
        assert_eq!(f.or(3), 2);
    }

    #[test]
    fn unknown_options_are_rejected() {
        let err = ModelSpec::from_options(ModelFamily::Mean, [("period", OptionValue::Int(4))])
            .unwrap_err();
        assert!(matches!(err, FableError::InvalidSpec(_)));

        let err = ModelSpec::from_options(ModelFamily::Ets, [("order", OptionValue::Int(1))])
            .unwrap_err();
        assert!(err.to_string().contains("unknown option `order` for ETS"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = ModelSpec::from_options(ModelFamily::Naive, [("drift", OptionValue::Int(1))])
            .unwrap_err();
        assert!(matches!(err, FableError::InvalidSpec(_)));
    }

    #[test]
    fn family_tags_round_trip() {
        for family in [
            ModelFamily::Ets,
            ModelFamily::Arima,
            ModelFamily::Mean,
            ModelFamily::Naive,
            ModelFamily::SeasonalNaive,
        ] {
            let spec = ModelSpec::from_options(family, Vec::<(&str, OptionValue)>::new()).unwrap();
            assert_eq!(spec.family(), family);
        }
    }

    #[test]
    fn specs_serialize() {
        let spec = ModelSpec::Ets(EtsSpec::default().with_error(ErrorType::Additive));
        let json = serde_json::to_string(&spec).unwrap();
        let back: ModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
