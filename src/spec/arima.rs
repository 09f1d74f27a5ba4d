//! ARIMA specification: orders, differencing and search policy.

use super::{auto_count, bad_value, count, criterion, unknown_option};
use super::{Auto, ModelFamily, OptionValue, SelectionCriterion};
use crate::error::{FableError, Result};
use serde::{Deserialize, Serialize};

/// How the (p, q, P, Q) space is explored once (d, D) is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Stepwise hill-climb from seed models.
    #[default]
    Stepwise,
    /// Every admissible combination.
    Exhaustive,
    /// Exhaustive when the grid has at most 100 points, stepwise otherwise.
    Auto,
}

/// Upper bounds of the automatic order search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaLimits {
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    pub max_seasonal_p: usize,
    pub max_seasonal_q: usize,
    pub max_seasonal_d: usize,
    /// Bound on p + q + P + Q.
    pub max_order: usize,
    /// Cap on the number of models fitted by a stepwise search.
    pub max_search_steps: usize,
}

impl Default for ArimaLimits {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_seasonal_p: 2,
            max_seasonal_q: 2,
            max_seasonal_d: 1,
            max_order: 5,
            max_search_steps: 94,
        }
    }
}

/// Specification for the automatic ARIMA fitter.
///
/// ```
/// use fable_forecast::spec::{ArimaSpec, Auto};
///
/// let spec = ArimaSpec::default().with_order(1, 1, 0).with_constant(true);
/// assert_eq!(spec.d, Auto::Fixed(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaSpec {
    pub p: Auto<usize>,
    pub d: Auto<usize>,
    pub q: Auto<usize>,
    pub seasonal_p: Auto<usize>,
    pub seasonal_d: Auto<usize>,
    pub seasonal_q: Auto<usize>,
    /// Seasonal period; automatic uses the series interval's default.
    pub period: Auto<usize>,
    /// Include a mean (d + D = 0) or drift (d + D = 1) term.
    pub constant: Auto<bool>,
    pub search: SearchStrategy,
    pub limits: ArimaLimits,
    pub criterion: SelectionCriterion,
    /// Optimiser iteration cap per candidate.
    pub max_iter: usize,
}

impl Default for ArimaSpec {
    fn default() -> Self {
        Self {
            p: Auto::Auto,
            d: Auto::Auto,
            q: Auto::Auto,
            seasonal_p: Auto::Auto,
            seasonal_d: Auto::Auto,
            seasonal_q: Auto::Auto,
            period: Auto::Auto,
            constant: Auto::Auto,
            search: SearchStrategy::Stepwise,
            limits: ArimaLimits::default(),
            criterion: SelectionCriterion::AICc,
            max_iter: 500,
        }
    }
}

impl ArimaSpec {
    pub fn with_order(mut self, p: usize, d: usize, q: usize) -> Self {
        self.p = Auto::Fixed(p);
        self.d = Auto::Fixed(d);
        self.q = Auto::Fixed(q);
        self
    }

    pub fn with_seasonal_order(mut self, p: usize, d: usize, q: usize) -> Self {
        self.seasonal_p = Auto::Fixed(p);
        self.seasonal_d = Auto::Fixed(d);
        self.seasonal_q = Auto::Fixed(q);
        self
    }

    /// Non-seasonal model: P = D = Q = 0.
    pub fn non_seasonal(self) -> Self {
        self.with_seasonal_order(0, 0, 0)
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Auto::Fixed(period);
        self
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = Auto::Fixed(constant);
        self
    }

    pub fn with_search(mut self, search: SearchStrategy) -> Self {
        self.search = search;
        self
    }

    pub fn with_limits(mut self, limits: ArimaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_criterion(mut self, criterion: SelectionCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub(crate) fn set_option(&mut self, name: &str, value: &OptionValue) -> Result<()> {
        let family = ModelFamily::Arima;
        match name {
            "p" => self.p = auto_count(family, name, value)?,
            "d" => self.d = auto_count(family, name, value)?,
            "q" => self.q = auto_count(family, name, value)?,
            "P" => self.seasonal_p = auto_count(family, name, value)?,
            "D" => self.seasonal_d = auto_count(family, name, value)?,
            "Q" => self.seasonal_q = auto_count(family, name, value)?,
            "period" => self.period = auto_count(family, name, value)?,
            "constant" => {
                self.constant = match value {
                    OptionValue::Auto => Auto::Auto,
                    OptionValue::Bool(b) => Auto::Fixed(*b),
                    other => return Err(bad_value(family, name, other, "a boolean or auto")),
                }
            }
            "search" => {
                self.search = match value {
                    OptionValue::Auto => SearchStrategy::Auto,
                    OptionValue::Text(t) if t == "stepwise" => SearchStrategy::Stepwise,
                    OptionValue::Text(t) if t == "exhaustive" => SearchStrategy::Exhaustive,
                    OptionValue::Text(t) if t == "auto" => SearchStrategy::Auto,
                    other => {
                        return Err(bad_value(
                            family,
                            name,
                            other,
                            "one of \"stepwise\", \"exhaustive\", \"auto\"",
                        ))
                    }
                }
            }
            "max_p" => self.limits.max_p = count(family, name, value)?,
            "max_q" => self.limits.max_q = count(family, name, value)?,
            "max_d" => self.limits.max_d = count(family, name, value)?,
            "max_P" => self.limits.max_seasonal_p = count(family, name, value)?,
            "max_Q" => self.limits.max_seasonal_q = count(family, name, value)?,
            "max_D" => self.limits.max_seasonal_d = count(family, name, value)?,
            "max_order" => self.limits.max_order = count(family, name, value)?,
            "max_search_steps" => self.limits.max_search_steps = count(family, name, value)?,
            "ic" => self.criterion = criterion(family, name, value)?,
            "max_iter" => self.max_iter = count(family, name, value)?,
            _ => return Err(unknown_option(family, name)),
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        let checks = [
            ("p", self.p, limits.max_p),
            ("d", self.d, limits.max_d),
            ("q", self.q, limits.max_q),
            ("P", self.seasonal_p, limits.max_seasonal_p),
            ("D", self.seasonal_d, limits.max_seasonal_d),
            ("Q", self.seasonal_q, limits.max_seasonal_q),
        ];
        for (name, value, max) in checks {
            if let Auto::Fixed(v) = value {
                if v > max {
                    return Err(FableError::InvalidSpec(format!(
                        "ARIMA order {} = {} exceeds its maximum {}",
                        name, v, max
                    )));
                }
            }
        }
        if let Auto::Fixed(0) = self.period {
            return Err(FableError::InvalidSpec(
                "ARIMA seasonal period must be at least 1".to_string(),
            ));
        }
        if let (Auto::Fixed(true), Auto::Fixed(d), Auto::Fixed(sd)) =
            (self.constant, self.d, self.seasonal_d)
        {
            if d + sd > 1 {
                return Err(FableError::InvalidSpec(format!(
                    "a constant requires d + D <= 1, got d + D = {}",
                    d + sd
                )));
            }
        }
        if limits.max_search_steps == 0 || self.max_iter == 0 {
            return Err(FableError::InvalidSpec(
                "ARIMA search and optimiser caps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
