//! Special functions at arbitrary precision
//!
//! Gamma-family functions, the regularized incomplete beta and gamma
//! functions, the error function and the continuous distributions built on
//! them. Every function evaluates in [`Decimal`] at the argument's precision
//! plus guard digits; `f64` only seeds iterations.

pub mod beta;
pub mod distributions;
pub mod erf;
pub mod gamma;

pub use beta::{ln_beta, regularized_incomplete_beta};
pub use distributions::{
    chi_square_cdf, chi_square_inverse_cdf, chi_square_pdf, chi_square_sf, f_cdf, f_inverse_cdf,
    f_pdf, f_sf, normal_cdf, normal_inverse_cdf, normal_pdf, normal_sf, students_t_cdf,
    students_t_inverse_cdf, students_t_pdf, students_t_sf,
};
pub use erf::{erf, erf_inv, erfc};
pub use gamma::{gamma, ln_gamma, regularized_gamma_p, regularized_gamma_q};

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::StatsResult;

/// Cap on continued-fraction and series iterations
pub(crate) const MAX_ITERATIONS: usize = 20_000;

/// Relative convergence threshold, `10^-digits`
pub(crate) fn epsilon(ctx: PrecisionContext) -> Decimal {
    ctx.pow10(-i64::from(ctx.digits()))
}

/// Stand-in for zero denominators in Lentz's algorithm
pub(crate) fn tiny(ctx: PrecisionContext) -> Decimal {
    ctx.pow10(-3 * i64::from(ctx.digits()))
}

/// Decimal digits in the integer part of `|x|`
pub(crate) fn magnitude_digits(x: &Decimal) -> u32 {
    if x.is_zero() {
        1
    } else {
        x.adjusted_exponent().max(0) as u32 + 1
    }
}

/// `e^x`, flushing results far below any representable precision to zero
pub(crate) fn exp_or_zero(x: &Decimal) -> StatsResult<Decimal> {
    if x.is_negative() && x.adjusted_exponent() > 15 {
        return Ok(x.context().zero());
    }
    x.exp()
}

/// Widest context among several values
pub(crate) fn widest(values: &[&Decimal]) -> PrecisionContext {
    values
        .iter()
        .map(|v| v.context())
        .reduce(|acc, c| acc.merge(&c))
        .unwrap_or_default()
}
