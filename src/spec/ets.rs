//! ETS specification: error, trend and seasonal component choices.

use super::{auto_count, bad_value, count, criterion, unknown_option};
use super::{Auto, ModelFamily, OptionValue, SelectionCriterion};
use crate::error::{FableError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorType {
    Additive,
    Multiplicative,
}

/// Trend component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrendType {
    None,
    Additive,
    AdditiveDamped,
}

/// Seasonal component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeasonalType {
    None,
    Additive,
    Multiplicative,
}

impl ErrorType {
    pub const ALL: [ErrorType; 2] = [ErrorType::Additive, ErrorType::Multiplicative];

    fn code(self) -> &'static str {
        match self {
            ErrorType::Additive => "A",
            ErrorType::Multiplicative => "M",
        }
    }
}

impl TrendType {
    pub const ALL: [TrendType; 3] = [TrendType::None, TrendType::Additive, TrendType::AdditiveDamped];

    fn code(self) -> &'static str {
        match self {
            TrendType::None => "N",
            TrendType::Additive => "A",
            TrendType::AdditiveDamped => "Ad",
        }
    }
}

impl SeasonalType {
    pub const ALL: [SeasonalType; 3] = [
        SeasonalType::None,
        SeasonalType::Additive,
        SeasonalType::Multiplicative,
    ];

    fn code(self) -> &'static str {
        match self {
            SeasonalType::None => "N",
            SeasonalType::Additive => "A",
            SeasonalType::Multiplicative => "M",
        }
    }
}

/// One concrete (error, trend, season) structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EtsComponents {
    pub error: ErrorType,
    pub trend: TrendType,
    pub season: SeasonalType,
}

impl EtsComponents {
    pub fn new(error: ErrorType, trend: TrendType, season: SeasonalType) -> Self {
        Self { error, trend, season }
    }

    pub fn has_trend(&self) -> bool {
        self.trend != TrendType::None
    }

    pub fn is_damped(&self) -> bool {
        self.trend == TrendType::AdditiveDamped
    }

    pub fn has_season(&self) -> bool {
        self.season != SeasonalType::None
    }

    pub fn is_multiplicative_error(&self) -> bool {
        self.error == ErrorType::Multiplicative
    }

    pub fn is_multiplicative_season(&self) -> bool {
        self.season == SeasonalType::Multiplicative
    }

    /// Number of smoothing parameters (alpha, beta, gamma, phi).
    pub fn smoothing_params(&self) -> usize {
        1 + usize::from(self.has_trend()) + usize::from(self.has_season()) + usize::from(self.is_damped())
    }
}

impl fmt::Display for EtsComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ETS({},{},{})",
            self.error.code(),
            self.trend.code(),
            self.season.code()
        )
    }
}

/// Specification for the automatic ETS fitter.
///
/// ```
/// use fable_forecast::spec::{EtsSpec, ErrorType, TrendType};
///
/// let spec = EtsSpec::default()
///     .with_error(ErrorType::Additive)
///     .with_trend(TrendType::AdditiveDamped);
/// assert_eq!(spec.candidates().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtsSpec {
    pub error: Auto<ErrorType>,
    pub trend: Auto<TrendType>,
    pub season: Auto<SeasonalType>,
    /// Seasonal period; automatic uses the series interval's default.
    pub period: Auto<usize>,
    pub criterion: SelectionCriterion,
    /// Optimiser iteration cap per candidate.
    pub max_iter: usize,
}

impl Default for EtsSpec {
    fn default() -> Self {
        Self {
            error: Auto::Auto,
            trend: Auto::Auto,
            season: Auto::Auto,
            period: Auto::Auto,
            criterion: SelectionCriterion::AICc,
            max_iter: 2000,
        }
    }
}

impl EtsSpec {
    /// A fully fixed structure.
    pub fn fixed(components: EtsComponents) -> Self {
        Self {
            error: Auto::Fixed(components.error),
            trend: Auto::Fixed(components.trend),
            season: Auto::Fixed(components.season),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: ErrorType) -> Self {
        self.error = Auto::Fixed(error);
        self
    }

    pub fn with_trend(mut self, trend: TrendType) -> Self {
        self.trend = Auto::Fixed(trend);
        self
    }

    pub fn with_season(mut self, season: SeasonalType) -> Self {
        self.season = Auto::Fixed(season);
        self
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Auto::Fixed(period);
        self
    }

    pub fn with_criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Cross product of allowed components in canonical order:
    /// error (A, M) x trend (N, A, Ad) x season (N, A, M).
    pub fn candidates(&self) -> Vec<EtsComponents> {
        let mut out = Vec::new();
        for error in ErrorType::ALL {
            if self.error.fixed().is_some_and(|e| *e != error) {
                continue;
            }
            for trend in TrendType::ALL {
                if self.trend.fixed().is_some_and(|t| *t != trend) {
                    continue;
                }
                for season in SeasonalType::ALL {
                    if self.season.fixed().is_some_and(|s| *s != season) {
                        continue;
                    }
                    out.push(EtsComponents::new(error, trend, season));
                }
            }
        }
        out
    }

    pub(crate) fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        let family = ModelFamily::Ets;
        match name {
            "error" => {
                self.error = parse_code(family, name, value, &[("A", ErrorType::Additive), ("M", ErrorType::Multiplicative)])?
            }
            "trend" => {
                self.trend = parse_code(
                    family,
                    name,
                    value,
                    &[
                        ("N", TrendType::None),
                        ("A", TrendType::Additive),
                        ("Ad", TrendType::AdditiveDamped),
                    ],
                )?
            }
            "season" => {
                self.season = parse_code(
                    family,
                    name,
                    value,
                    &[
                        ("N", SeasonalType::None),
                        ("A", SeasonalType::Additive),
                        ("M", SeasonalType::Multiplicative),
                    ],
                )?
            }
            "period" => self.period = auto_count(family, name, value)?,
            "ic" => self.criterion = criterion(family, name, value)?,
            "max_iter" => self.max_iter = count(family, name, value)?,
            _ => return Err(unknown_option(family, name)),
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Auto::Fixed(0) = self.period {
            return Err(FableError::InvalidSpec(
                "ETS seasonal period must be at least 1".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(FableError::InvalidSpec(
                "ETS max_iter must be positive".to_string(),
            ));
        }
        if self.candidates().is_empty() {
            return Err(FableError::InvalidSpec(
                "ETS specification admits no candidate".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_code<T: Copy>(
    family: ModelFamily,
    name: &str,
    value: &OptionValue,
    table: &[(&str, T)],
) -> Result<Auto<T>> {
    let codes: Vec<&str> = table.iter().map(|(c, _)| *c).collect();
    let want = format!("auto or one of {:?}", codes);
    match value {
        OptionValue::Auto => Ok(Auto::Auto),
        OptionValue::Text(text) if text.eq_ignore_ascii_case("auto") => Ok(Auto::Auto),
        OptionValue::Text(text) => table
            .iter()
            .find(|(code, _)| code == text)
            .map(|(_, v)| Auto::Fixed(*v))
            .ok_or_else(|| bad_value(family, name, value, &want)),
        other => Err(bad_value(family, name, other, &want)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ModelSpec;

    #[test]
    fn full_search_has_eighteen_candidates_in_canonical_order() {
        let candidates = EtsSpec::default().candidates();
        assert_eq!(candidates.len(), 18);
        assert_eq!(candidates[0].to_string(), "ETS(A,N,N)");
        assert_eq!(candidates[1].to_string(), "ETS(A,N,A)");
        assert_eq!(candidates[5].to_string(), "ETS(A,A,M)");
        assert_eq!(candidates[17].to_string(), "ETS(M,Ad,M)");
    }

    #[test]
    fn fixed_components_restrict_candidates() {
        let spec = EtsSpec::default()
            .with_error(ErrorType::Multiplicative)
            .with_season(SeasonalType::None);
        let labels: Vec<String> = spec.candidates().iter().map(|c| c.to_string()).collect();
        assert_eq!(labels, vec!["ETS(M,N,N)", "ETS(M,A,N)", "ETS(M,Ad,N)"]);
    }

    #[test]
    fn options_parse_codes() {
        let spec = ModelSpec::from_options(
            ModelFamily::Ets,
            [
                ("error", OptionValue::Text("M".into())),
                ("trend", OptionValue::Text("Ad".into())),
                ("season", OptionValue::Auto),
                ("ic", OptionValue::Text("bic".into())),
            ],
        )
        .unwrap();
        let ModelSpec::Ets(ets) = spec else {
            panic!("expected ETS spec");
        };
        assert_eq!(ets.error, Auto::Fixed(ErrorType::Multiplicative));
        assert_eq!(ets.trend, Auto::Fixed(TrendType::AdditiveDamped));
        assert!(ets.season.is_auto());
        assert_eq!(ets.criterion, SelectionCriterion::BIC);
    }

    #[test]
    fn illegal_values_are_invalid_spec() {
        for (name, value) in [
            ("trend", OptionValue::Text("M".into())),
            ("period", OptionValue::Int(0)),
            ("period", OptionValue::Int(-4)),
            ("ic", OptionValue::Text("hqic".into())),
        ] {
            let err = ModelSpec::from_options(ModelFamily::Ets, [(name, value)]).unwrap_err();
            assert!(matches!(err, FableError::InvalidSpec(_)), "{}", name);
        }
    }

    #[test]
    fn parameter_counts() {
        let c = EtsComponents::new(ErrorType::Additive, TrendType::AdditiveDamped, SeasonalType::Additive);
        assert_eq!(c.smoothing_params(), 4);
        assert_eq!(c.to_string(), "ETS(A,Ad,A)");
    }
}
