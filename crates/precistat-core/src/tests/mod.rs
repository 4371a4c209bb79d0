//! Hypothesis-test kernels
//!
//! Every kernel validates its sizes, computes aggregates at working
//! precision, forms its statistic, evaluates the p-value from the
//! special-function layer and passes the result through [`crate::safety`]
//! before returning it.


use serde::Serialize;

use crate::aggregate::AggregateStatistics;
use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::special::{normal_cdf, normal_sf, students_t_cdf, students_t_sf};
pub use crate::types::{Alternative, ConfidenceInterval};
use crate::{StatsError, StatsResult};

/// Generic test result shared by all kernels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Test method/name
    pub method: String,
    /// Test statistic (t, F, chi2, ...)
    pub statistic: Decimal,
    /// p-value, always within [0, 1]
    pub p_value: Decimal,
    pub degrees_of_freedom: Option<Decimal>,
    /// Effect size (Cohen's d, eta squared, Cramér's V, ...)
    pub effect_size: Option<Decimal>,
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Total sample size
    pub n: usize,
    pub alternative: Alternative,
    /// Set when the safety policy replaced a value
    pub extreme_flag: bool,
    pub interpretation_note: Option<String>,
    /// Assumption warnings that did not prevent the test
    pub warnings: Vec<String>,
}

impl TestResult {
    pub fn new(
        method: impl Into<String>,
        statistic: Decimal,
        p_value: Decimal,
        n: usize,
        alternative: Alternative,
    ) -> Self {
        Self {
            method: method.into(),
            statistic,
            p_value,
            degrees_of_freedom: None,
            effect_size: None,
            confidence_interval: None,
            n,
            alternative,
            extreme_flag: false,
            interpretation_note: None,
            warnings: Vec::new(),
        }
    }
}

/// Extended test result for ANOVA
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaResult {
    #[serde(flatten)]
    pub test: TestResult,
    pub ss_between: Decimal,
    pub ss_within: Decimal,
    pub ss_total: Decimal,
    pub ms_between: Decimal,
    pub ms_within: Decimal,
    pub df_between: usize,
    pub df_within: usize,
    pub eta_squared: Option<Decimal>,
    pub omega_squared: Option<Decimal>,
    /// Per-group aggregates in input order
    pub groups: Vec<AggregateStatistics>,
}

/// Correlation test result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    #[serde(flatten)]
    pub test: TestResult,
    /// Correlation coefficient, within [-1, 1]
    pub coefficient: Decimal,
}

/// Fisher's exact test result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FisherExactResult {
    #[serde(flatten)]
    pub test: TestResult,
    /// Sample odds ratio; `None` when both cross products vanish
    pub odds_ratio: Option<Decimal>,
}

/// p-value of a Student t statistic
pub(crate) fn t_p_value(t: &Decimal, df: &Decimal, alternative: Alternative) -> StatsResult<Decimal> {
    match alternative {
        Alternative::TwoSided if t.is_zero() => Ok(t.context().one()),
        Alternative::TwoSided => Ok(students_t_sf(&t.abs(), df)? * 2),
        Alternative::Greater => students_t_sf(t, df),
        Alternative::Less => students_t_cdf(t, df),
    }
}

/// p-value of a standard normal statistic
pub(crate) fn z_p_value(z: &Decimal, alternative: Alternative) -> StatsResult<Decimal> {
    match alternative {
        Alternative::TwoSided if z.is_zero() => Ok(z.context().one()),
        Alternative::TwoSided => Ok(normal_sf(&z.abs())? * 2),
        Alternative::Greater => normal_sf(z),
        Alternative::Less => normal_cdf(z),
    }
}

/// Tail probability that sets the critical value of an interval:
/// `(1 - level) / 2` two-sided, `1 - level` one-sided.
pub(crate) fn interval_tail(level: &Decimal, alternative: Alternative, ctx: PrecisionContext) -> Decimal {
    let miss = ctx.working().one() - level;
    match alternative {
        Alternative::TwoSided => miss / 2,
        _ => miss,
    }
}

/// `estimate ± critical * se` with the open side dropped for one-sided
/// alternatives.
pub(crate) fn interval(
    estimate: &Decimal,
    margin: &Decimal,
    level: &Decimal,
    alternative: Alternative,
    ctx: PrecisionContext,
) -> ConfidenceInterval {
    let lower = (estimate - margin).with_context(ctx);
    let upper = (estimate + margin).with_context(ctx);
    let (lower, upper) = match alternative {
        Alternative::TwoSided => (Some(lower), Some(upper)),
        Alternative::Greater => (Some(lower), None),
        Alternative::Less => (None, Some(upper)),
    };
    ConfidenceInterval {
        lower,
        upper,
        level: level.with_context(ctx),
    }
}

/// Reject ragged contingency tables
pub(crate) fn check_table(table: &[Vec<u64>], test: &'static str) -> StatsResult<(usize, usize)> {
    let rows = table.len();
    let cols = table.first().map_or(0, Vec::len);
    if rows < 2 || cols < 2 {
        return Err(StatsError::InvalidArgument(format!(
            "{} requires at least a 2x2 table, got {}x{}",
            test, rows, cols
        )));
    }
    if let Some((i, row)) = table.iter().enumerate().find(|(_, row)| row.len() != cols) {
        return Err(StatsError::ShapeMismatch(format!(
            "row {} has {} columns, expected {}",
            i,
            row.len(),
            cols
        )));
    }
    Ok((rows, cols))
}

/// Rebase a sample onto the working context
pub(crate) fn working_sample(sample: &[Decimal], ctx: PrecisionContext) -> Vec<Decimal> {
    let w = ctx.working();
    sample.iter().map(|x| x.with_context(w)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PrecisionContext {
        PrecisionContext::default()
    }

    #[test]
    fn test_t_p_value_alternatives() {
        let t = ctx().parse("2.5").unwrap();
        let df = ctx().int(10);
        let two = t_p_value(&t, &df, Alternative::TwoSided).unwrap();
        let greater = t_p_value(&t, &df, Alternative::Greater).unwrap();
        let less = t_p_value(&t, &df, Alternative::Less).unwrap();
        assert_eq!(two, &greater * 2);
        assert!((greater + less - 1).abs() < ctx().pow10(-48));
    }

    #[test]
    fn test_interval_one_sided() {
        let level = ctx().parse("0.95").unwrap();
        let ci = interval(&ctx().int(10), &ctx().int(2), &level, Alternative::Greater, ctx());
        assert_eq!(ci.lower, Some(ctx().int(8)));
        assert_eq!(ci.upper, None);
        let tail = interval_tail(&level, Alternative::TwoSided, ctx());
        assert_eq!(tail, ctx().parse("0.025").unwrap());
    }

    #[test]
    fn test_check_table() {
        assert!(check_table(&[vec![1, 2], vec![3, 4]], "chi").is_ok());
        assert!(matches!(
            check_table(&[vec![1, 2], vec![3]], "chi"),
            Err(StatsError::ShapeMismatch(_))
        ));
        assert!(check_table(&[vec![1, 2]], "chi").is_err());
    }
}
