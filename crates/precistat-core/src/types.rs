use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::StatsError;

/// Alternative hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    #[default]
    TwoSided,
    /// Parameter below the hypothesized value
    Less,
    /// Parameter above the hypothesized value
    Greater,
}

impl FromStr for Alternative {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two_sided" | "two-sided" | "two.sided" | "two_tailed" => Ok(Alternative::TwoSided),
            "less" => Ok(Alternative::Less),
            "greater" => Ok(Alternative::Greater),
            other => Err(StatsError::UnsupportedConfiguration(format!(
                "unknown alternative '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alternative::TwoSided => "two_sided",
            Alternative::Less => "less",
            Alternative::Greater => "greater",
        })
    }
}

/// Confidence interval; one-sided alternatives leave one bound open
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: Option<Decimal>,
    pub upper: Option<Decimal>,
    pub level: Decimal,
}

/// Default confidence level, 0.95
pub fn default_confidence_level() -> Decimal {
    Decimal::from_i64(95, PrecisionContext::default()).scale10(-2)
}

/// Default significance level, 0.05
pub fn default_alpha() -> Decimal {
    Decimal::from_i64(5, PrecisionContext::default()).scale10(-2)
}

/// Reject probabilities outside the open interval (0, 1)
pub(crate) fn check_level(level: &Decimal, name: &str) -> Result<(), StatsError> {
    if !level.is_positive() || *level >= level.context().one() {
        return Err(StatsError::InvalidArgument(format!(
            "{} must lie strictly between 0 and 1, got {}",
            name, level
        )));
    }
    Ok(())
}
