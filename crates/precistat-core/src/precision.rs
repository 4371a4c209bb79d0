//! Precision context
//!
//! Every arithmetic operation in the engine is parameterized by a
//! [`PrecisionContext`]: the number of significant decimal digits kept after
//! each operation and the rounding mode used to get there. Contexts are plain
//! `Copy` values, so a result computed under one context is never affected by
//! later configuration changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::errors::{StatsError, StatsResult};

/// Default number of significant digits
pub const DEFAULT_DIGITS: u32 = 50;

/// Largest supported number of significant digits
pub const MAX_DIGITS: u32 = 200;

/// Extra digits carried by special-function evaluations before the final
/// rounding back to the caller's precision.
pub const GUARD_DIGITS: u32 = 10;

/// Environment variable overriding the number of digits
pub const DIGITS_ENV: &str = "PRECISTAT_DIGITS";

/// Environment variable overriding the rounding mode
pub const ROUNDING_ENV: &str = "PRECISTAT_ROUNDING";

/// Rounding applied when a result has more digits than the context allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round to nearest, ties away from zero
    #[default]
    HalfUp,
    /// Round to nearest, ties toward zero
    HalfDown,
    /// Round to nearest, ties to the even neighbour
    HalfEven,
    /// Away from zero
    Up,
    /// Toward zero (truncate)
    Down,
    /// Toward positive infinity
    Ceiling,
    /// Toward negative infinity
    Floor,
}

impl RoundingMode {
    /// Decide whether a truncated magnitude must be incremented.
    ///
    /// `odd` is the parity of the kept magnitude and `half` compares the
    /// discarded remainder against one half of the last kept unit.
    pub(crate) fn increments(
        self,
        negative: bool,
        odd: bool,
        remainder_nonzero: bool,
        half: std::cmp::Ordering,
    ) -> bool {
        use std::cmp::Ordering::*;
        match self {
            RoundingMode::HalfUp => half != Less,
            RoundingMode::HalfDown => half == Greater,
            RoundingMode::HalfEven => half == Greater || (half == Equal && odd),
            RoundingMode::Up => remainder_nonzero,
            RoundingMode::Down => false,
            RoundingMode::Ceiling => remainder_nonzero && !negative,
            RoundingMode::Floor => remainder_nonzero && negative,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = StatsError;

    fn from_str(s: &str) -> StatsResult<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        // "ROUND_HALF_EVEN" style names come from decimal libraries
        let normalized = normalized.strip_prefix("round_").unwrap_or(&normalized);
        match normalized {
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_down" => Ok(RoundingMode::HalfDown),
            "half_even" | "bankers" => Ok(RoundingMode::HalfEven),
            "up" => Ok(RoundingMode::Up),
            "down" | "truncate" => Ok(RoundingMode::Down),
            "ceiling" => Ok(RoundingMode::Ceiling),
            "floor" => Ok(RoundingMode::Floor),
            _ => Err(StatsError::UnsupportedConfiguration(format!(
                "unknown rounding mode '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundingMode::HalfUp => "half_up",
            RoundingMode::HalfDown => "half_down",
            RoundingMode::HalfEven => "half_even",
            RoundingMode::Up => "up",
            RoundingMode::Down => "down",
            RoundingMode::Ceiling => "ceiling",
            RoundingMode::Floor => "floor",
        };
        f.write_str(name)
    }
}

/// Decimal precision and rounding used by every computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawContext")]
pub struct PrecisionContext {
    digits: u32,
    #[serde(default)]
    rounding: RoundingMode,
}

#[derive(Deserialize)]
struct RawContext {
    #[serde(default = "default_digits")]
    digits: u32,
    #[serde(default)]
    rounding: RoundingMode,
}

fn default_digits() -> u32 {
    DEFAULT_DIGITS
}

impl TryFrom<RawContext> for PrecisionContext {
    type Error = StatsError;

    fn try_from(raw: RawContext) -> StatsResult<Self> {
        PrecisionContext::new(raw.digits, raw.rounding)
    }
}

impl Default for PrecisionContext {
    fn default() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
            rounding: RoundingMode::HalfUp,
        }
    }
}

impl PrecisionContext {
    /// Create a validated context
    pub fn new(digits: u32, rounding: RoundingMode) -> StatsResult<Self> {
        if digits == 0 || digits > MAX_DIGITS {
            return Err(StatsError::UnsupportedConfiguration(format!(
                "precision must be between 1 and {} digits, got {}",
                MAX_DIGITS, digits
            )));
        }
        Ok(Self { digits, rounding })
    }

    /// Context with the given digits and half-up rounding
    pub fn with_digits(digits: u32) -> StatsResult<Self> {
        Self::new(digits, RoundingMode::HalfUp)
    }

    /// Read `PRECISTAT_DIGITS` / `PRECISTAT_ROUNDING`, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> StatsResult<Self> {
        let digits = match std::env::var(DIGITS_ENV) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|_| {
                StatsError::UnsupportedConfiguration(format!(
                    "{} must be a positive integer, got '{}'",
                    DIGITS_ENV, raw
                ))
            })?,
            Err(_) => DEFAULT_DIGITS,
        };
        let rounding = match std::env::var(ROUNDING_ENV) {
            Ok(raw) => raw.parse()?,
            Err(_) => RoundingMode::default(),
        };
        let ctx = Self::new(digits, rounding)?;
        tracing::debug!(digits = ctx.digits, rounding = %ctx.rounding, "precision context from environment");
        Ok(ctx)
    }

    /// Significant digits kept after every operation
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Rounding mode
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Same rounding with `extra` more digits. Not bounded by [`MAX_DIGITS`];
    /// used for intermediate results only.
    pub fn widen(&self, extra: u32) -> Self {
        Self {
            digits: self.digits + extra,
            rounding: self.rounding,
        }
    }

    /// Working context for special-function evaluation
    pub(crate) fn working(&self) -> Self {
        self.widen(GUARD_DIGITS)
    }

    /// The wider of two contexts; ties keep `self`.
    pub(crate) fn merge(&self, other: &Self) -> Self {
        if other.digits > self.digits {
            *other
        } else {
            *self
        }
    }

    // Value constructors

    pub fn zero(&self) -> Decimal {
        Decimal::zero(*self)
    }

    pub fn one(&self) -> Decimal {
        Decimal::from_i64(1, *self)
    }

    pub fn int(&self, value: i64) -> Decimal {
        Decimal::from_i64(value, *self)
    }

    pub fn uint(&self, value: u64) -> Decimal {
        Decimal::from_u64(value, *self)
    }

    /// Parse a decimal literal (`"1.25"`, `"-3e-7"`) rounded to this context
    pub fn parse(&self, literal: &str) -> StatsResult<Decimal> {
        Decimal::parse(literal, *self)
    }

    /// Convert a finite float through its shortest round-trip decimal form
    pub fn from_f64(&self, value: f64) -> StatsResult<Decimal> {
        Decimal::from_f64(value, *self)
    }

    /// Convert a float slice, rejecting NaN and infinities
    pub fn sample(&self, values: &[f64]) -> StatsResult<Vec<Decimal>> {
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if value.is_finite() {
                    Decimal::from_f64(value, *self)
                } else {
                    Err(StatsError::NonFiniteInput { index, value })
                }
            })
            .collect()
    }

    /// `10^exponent` exactly
    pub fn pow10(&self, exponent: i64) -> Decimal {
        Decimal::pow10(exponent, *self)
    }
}
