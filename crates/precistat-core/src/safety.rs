//! Numeric-safety policy
//!
//! Applied where kernels hand results back. Degenerate inputs (zero
//! effect over zero spread) become a null result, zero spread with a real
//! effect becomes a flagged sentinel, oversized statistics are capped, and
//! probabilities and correlations are clamped to their ranges.

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::tests::TestResult;
use crate::types::Alternative;

/// Magnitude reported for a statistic whose standard error vanished
pub const SENTINEL_MAGNITUDE: &str = "999.999";

/// Statistics above `10^15` in magnitude are reported capped
pub const STATISTIC_CAP_EXPONENT: i64 = 15;

pub const DEGENERATE_NOTE: &str =
    "Effect and standard error are both zero at working precision: the data show no variation to test.";
pub const EXTREME_NOTE: &str =
    "Standard error is zero at working precision while the effect is not: statistic reported as a sentinel and p-value as the precision floor.";
pub const CAPPED_NOTE: &str =
    "Test statistic exceeded 1e15 in magnitude and was capped; the p-value was computed from the uncapped value.";
pub const PERFECT_CORRELATION_NOTE: &str =
    "Perfect correlation: the association is deterministic and the p-value is exactly zero.";
pub const INFINITE_ODDS_NOTE: &str =
    "Odds ratio is infinite (a zero off-diagonal product): reported as the sentinel.";

/// Absolute threshold below which a spread counts as zero: `10^-(digits-5)`,
/// never coarser than `0.1`.
pub fn threshold(ctx: PrecisionContext) -> Decimal {
    let exponent = i64::from(ctx.digits()).max(6) - 5;
    ctx.pow10(-exponent)
}

/// Smallest reported p-value, `10^-digits`
pub fn p_value_floor(ctx: PrecisionContext) -> Decimal {
    ctx.pow10(-i64::from(ctx.digits()))
}

/// Relative tolerance for "as extreme as observed" ties, `10^-digits`
pub fn tie_tolerance(ctx: PrecisionContext) -> Decimal {
    p_value_floor(ctx)
}

/// `±999.999`
pub fn sentinel(positive: bool, ctx: PrecisionContext) -> Decimal {
    let magnitude = ctx.int(999_999).scale10(-3);
    if positive {
        magnitude
    } else {
        -magnitude
    }
}

/// How a ratio statistic `effect / spread` has to be reported
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Both effect and spread vanish
    Degenerate,
    /// Spread vanishes, effect does not
    Extreme { positive: bool },
    /// Ordinary ratio
    Regular,
}

pub fn classify(effect: &Decimal, spread: &Decimal, ctx: PrecisionContext) -> Verdict {
    let limit = threshold(ctx);
    if spread.abs() >= limit {
        return Verdict::Regular;
    }
    if effect.abs() < limit {
        Verdict::Degenerate
    } else {
        Verdict::Extreme {
            positive: !effect.is_negative(),
        }
    }
}

/// Statistic 0, p 1, not flagged
pub fn mark_degenerate(result: &mut TestResult, ctx: PrecisionContext) {
    result.statistic = ctx.zero();
    result.p_value = ctx.one();
    result.extreme_flag = false;
    result.confidence_interval = None;
    result.interpretation_note = Some(DEGENERATE_NOTE.to_string());
}

/// Sentinel statistic with the p-value floor in the effect's direction
/// (and 1 for the opposite one-sided alternative).
pub fn mark_extreme(result: &mut TestResult, positive: bool, ctx: PrecisionContext) {
    let against = matches!(
        (result.alternative, positive),
        (Alternative::Less, true) | (Alternative::Greater, false)
    );
    result.statistic = sentinel(positive, ctx);
    result.p_value = if against { ctx.one() } else { p_value_floor(ctx) };
    result.extreme_flag = true;
    result.confidence_interval = None;
    result.interpretation_note = Some(EXTREME_NOTE.to_string());
    tracing::warn!(method = %result.method, "zero standard error with nonzero effect");
}

/// Perfect correlation: p exactly zero, flagged
pub fn mark_perfect_correlation(result: &mut TestResult, positive: bool, ctx: PrecisionContext) {
    let against = matches!(
        (result.alternative, positive),
        (Alternative::Less, true) | (Alternative::Greater, false)
    );
    result.statistic = sentinel(positive, ctx);
    result.p_value = if against { ctx.one() } else { ctx.zero() };
    result.extreme_flag = true;
    result.interpretation_note = Some(PERFECT_CORRELATION_NOTE.to_string());
    tracing::warn!(method = %result.method, "perfect correlation");
}

/// Infinite odds ratio: sentinel statistic, p-value untouched
pub fn mark_infinite_odds(result: &mut TestResult, ctx: PrecisionContext) {
    result.statistic = sentinel(true, ctx);
    result.extreme_flag = true;
    result.interpretation_note = Some(INFINITE_ODDS_NOTE.to_string());
    tracing::warn!(method = %result.method, "infinite odds ratio");
}

/// Cap oversized statistics and clamp the p-value into `[0, 1]`
pub fn finalize(result: &mut TestResult, ctx: PrecisionContext) {
    let cap = ctx.pow10(STATISTIC_CAP_EXPONENT);
    if result.statistic.abs() > cap {
        let positive = result.statistic.is_positive();
        result.statistic = if positive { cap } else { -cap };
        result.extreme_flag = true;
        result.interpretation_note = Some(CAPPED_NOTE.to_string());
        tracing::warn!(method = %result.method, "test statistic capped");
    }
    result.p_value = clamp_probability(&result.p_value, ctx);
}

pub fn clamp_probability(p: &Decimal, ctx: PrecisionContext) -> Decimal {
    p.clamp_to(&ctx.zero(), &ctx.one()).with_context(ctx)
}

pub fn clamp_correlation(r: &Decimal, ctx: PrecisionContext) -> Decimal {
    r.clamp_to(&ctx.int(-1), &ctx.one()).with_context(ctx)
}
