//! Error function via the incomplete gamma function
//!
//! `erf(x) = sgn(x) P(1/2, x²)` and `erfc(x) = Q(1/2, x²)` for `x >= 0`.

use super::distributions::normal_inverse_cdf;
use super::gamma::gamma_pq;
use crate::decimal::Decimal;
use crate::{StatsError, StatsResult};

pub fn erf(x: &Decimal) -> StatsResult<Decimal> {
    let ctx = x.context();
    if x.is_zero() {
        return Ok(ctx.zero());
    }
    let w = ctx.working();
    let x = x.with_context(w);
    let (p, _) = gamma_pq(&(w.one() / 2), &(&x * &x))?;
    let value = if x.is_negative() { -p } else { p };
    Ok(value.with_context(ctx))
}

pub fn erfc(x: &Decimal) -> StatsResult<Decimal> {
    let ctx = x.context();
    if x.is_zero() {
        return Ok(ctx.one());
    }
    let w = ctx.working();
    let x = x.with_context(w);
    let (p, q) = gamma_pq(&(w.one() / 2), &(&x * &x))?;
    let value = if x.is_negative() { p + 1 } else { q };
    Ok(value.with_context(ctx))
}

/// Inverse error function on (-1, 1), through the normal quantile:
/// `erf_inv(y) = Φ⁻¹((1 + y) / 2) / √2`
pub fn erf_inv(y: &Decimal) -> StatsResult<Decimal> {
    let ctx = y.context();
    let w = ctx.working();
    let y = y.with_context(w);
    if y.abs() >= w.one() {
        return Err(StatsError::domain("erf_inv", &y));
    }
    if y.is_zero() {
        return Ok(ctx.zero());
    }
    let p = (&y + 1) / 2;
    let z = normal_inverse_cdf(&p)?;
    Ok((z / w.int(2).sqrt()?).with_context(ctx))
}
