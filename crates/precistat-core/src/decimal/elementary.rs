//! Elementary functions at arbitrary precision
//!
//! All functions evaluate at the argument's precision plus guard digits and
//! round once on the way out. Range reduction keeps every series argument
//! small so term counts stay proportional to the digit count.

use num_bigint::{BigInt, Sign};

use super::{digit_count, normalize, pow10_big, Decimal};
use crate::errors::{StatsError, StatsResult};
use crate::precision::{PrecisionContext, GUARD_DIGITS};

/// Largest `|x|` accepted by `exp` (beyond it the exponent of the result
/// would not fit the representation).
const EXP_ARGUMENT_LIMIT_EXPONENT: i64 = 15;

/// Number of halvings applied after the ln 2 reduction in `exp`
const EXP_HALVINGS: u32 = 8;

fn decimal_width(value: u64) -> u32 {
    value.checked_ilog10().map_or(1, |d| d + 1)
}

/// Sum of `s^(2k+1) / (2k+1)` for small `|s|`
fn atanh_series(s: &Decimal) -> Decimal {
    if s.is_zero() {
        return s.clone();
    }
    let digits = s.ctx.digits();
    let s2 = s * s;
    let mut power = s.clone();
    let mut sum = s.clone();
    let mut k = 1i64;
    loop {
        power = &power * &s2;
        k += 2;
        let term = &power / k;
        if term.negligible_against(&sum, digits) {
            break;
        }
        sum += &term;
    }
    sum
}

/// Sum of `x^n / n!` for `n >= start`
fn exp_series(x: &Decimal, start_with_one: bool) -> Decimal {
    let ctx = x.ctx;
    let digits = ctx.digits();
    let mut term = x.clone();
    let mut sum = if start_with_one { ctx.one() + x } else { x.clone() };
    let mut n = 1i64;
    loop {
        n += 1;
        term = &term * x / n;
        if term.negligible_against(&sum, digits) {
            break;
        }
        sum += &term;
    }
    sum
}

/// ln(x) for x within a factor ~1.5 of one
fn ln_near_one(x: &Decimal) -> Decimal {
    let one = x.ctx.one();
    let s = (x - &one) / (x + &one);
    atanh_series(&s) * 2
}

/// Sum of `(-1)^k / ((2k+1) n^(2k+1))`
fn atan_inverse(n: i64, ctx: PrecisionContext) -> Decimal {
    let n2 = n * n;
    let mut power = ctx.one() / n;
    let mut sum = power.clone();
    let mut k = 0i64;
    loop {
        k += 1;
        power = &power / n2;
        let term = &power / (2 * k + 1);
        if term.negligible_against(&sum, ctx.digits()) {
            break;
        }
        if k % 2 == 1 {
            sum -= &term;
        } else {
            sum += &term;
        }
    }
    sum
}

impl Decimal {
    /// π (Machin's formula)
    pub fn pi(ctx: PrecisionContext) -> Decimal {
        let w = ctx.widen(5);
        let pi = (atan_inverse(5, w) * 4 - atan_inverse(239, w)) * 4;
        pi.with_context(ctx)
    }

    /// ln 2 = 2 atanh(1/3)
    pub fn ln2(ctx: PrecisionContext) -> Decimal {
        let w = ctx.widen(5);
        let third = w.one() / 3;
        (atanh_series(&third) * 2).with_context(ctx)
    }

    /// ln 10 = 3 ln 2 + 2 atanh(1/9)
    pub fn ln10(ctx: PrecisionContext) -> Decimal {
        let w = ctx.widen(5);
        let ninth = w.one() / 9;
        (Decimal::ln2(w) * 3 + atanh_series(&ninth) * 2).with_context(ctx)
    }

    /// Square root, correctly rounded
    pub fn sqrt(&self) -> StatsResult<Decimal> {
        if self.is_negative() {
            return Err(StatsError::domain("sqrt", self));
        }
        let ctx = self.ctx;
        if self.is_zero() {
            return Ok(Decimal::zero(ctx));
        }
        let magnitude = self.mantissa.magnitude();
        let target = 2 * (ctx.digits() + 2);
        let mut shift = i64::from(target.saturating_sub(digit_count(magnitude)));
        if (self.exponent - shift).rem_euclid(2) != 0 {
            shift += 1;
        }
        let scaled = magnitude * pow10_big(shift as u32);
        let root = scaled.sqrt();
        let exponent = (self.exponent - shift) / 2;
        let (root, exponent) = if &root * &root == scaled {
            (root, exponent)
        } else {
            (root * 10u32 + 1u32, exponent - 1)
        };
        Ok(normalize(BigInt::from_biguint(Sign::Plus, root), exponent, ctx))
    }

    /// Natural logarithm
    pub fn ln(&self) -> StatsResult<Decimal> {
        if !self.is_positive() {
            return Err(StatsError::domain("ln", self));
        }
        let ctx = self.ctx;
        let adjusted = self.adjusted_exponent();
        let w = ctx.widen(GUARD_DIGITS + decimal_width(adjusted.unsigned_abs()));
        let x = self.with_context(w);
        let half = w.one() / 2;

        let result = if (&x - &w.one()).abs() < half {
            ln_near_one(&x)
        } else {
            // x = 10^adjusted * 2^halvings * z with z in [0.70, 1.42)
            let mut z = x.scale10(-adjusted);
            let limit = w.parse("1.42")?;
            let mut halvings = 0i64;
            while z > limit {
                z = &z / 2;
                halvings += 1;
            }
            let mut result = ln_near_one(&z);
            if halvings != 0 {
                result += Decimal::ln2(w) * halvings;
            }
            if adjusted != 0 {
                result += Decimal::ln10(w) * adjusted;
            }
            result
        };
        Ok(result.with_context(ctx))
    }

    /// ln(1 + x), accurate for small `x`
    pub fn ln_1p(&self) -> StatsResult<Decimal> {
        let ctx = self.ctx;
        let w = ctx.working();
        let x = self.with_context(w);
        let one = w.one();
        if &x + &one <= Decimal::zero(w) {
            return Err(StatsError::domain("ln_1p", self));
        }
        if x.abs() < one / 2 {
            let s = &x / (&x + 2);
            return Ok((atanh_series(&s) * 2).with_context(ctx));
        }
        Ok((x + 1).ln()?.with_context(ctx))
    }

    /// e^x
    pub fn exp(&self) -> StatsResult<Decimal> {
        let ctx = self.ctx;
        if self.is_zero() {
            return Ok(ctx.one());
        }
        let adjusted = self.adjusted_exponent();
        if adjusted > EXP_ARGUMENT_LIMIT_EXPONENT {
            return Err(StatsError::domain("exp", self));
        }
        let w = ctx.widen(GUARD_DIGITS + 3 + adjusted.max(0) as u32 + 1);
        let x = self.with_context(w);
        let ln2 = Decimal::ln2(w);
        let k = (&x / &ln2)
            .round_to_i64()
            .ok_or_else(|| StatsError::domain("exp", self))?;
        let reduced = (&x - &ln2 * k) / (1i64 << EXP_HALVINGS);

        let mut y = exp_series(&reduced, true);
        for _ in 0..EXP_HALVINGS {
            y = &y * &y;
        }
        let two = w.int(2);
        let scaled = if k >= 0 {
            y * two.powi(k as u64)
        } else {
            y / two.powi(k.unsigned_abs())
        };
        Ok(scaled.with_context(ctx))
    }

    /// e^x - 1, accurate for small `x`
    pub fn exp_m1(&self) -> StatsResult<Decimal> {
        let ctx = self.ctx;
        let w = ctx.working();
        let x = self.with_context(w);
        if x.is_zero() {
            return Ok(Decimal::zero(ctx));
        }
        if x.abs() < w.one() / 2 {
            return Ok(exp_series(&x, false).with_context(ctx));
        }
        Ok((x.exp()? - 1).with_context(ctx))
    }

    /// x^n by binary powering
    pub fn powi(&self, n: u64) -> Decimal {
        let ctx = self.ctx;
        let w = ctx.widen(GUARD_DIGITS + decimal_width(n));
        let mut base = self.with_context(w);
        let mut result = w.one();
        let mut e = n;
        while e > 0 {
            if e & 1 == 1 {
                result = &result * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        result.with_context(ctx)
    }

    /// x^y for real `y`; negative bases only with integral exponents
    pub fn pow(&self, exponent: &Decimal) -> StatsResult<Decimal> {
        let ctx = self.ctx.merge(&exponent.ctx);
        if exponent.is_zero() {
            return Ok(ctx.one());
        }
        if exponent.is_integer() {
            if let Some(n) = exponent.round_to_i64() {
                if n > 0 {
                    return Ok(self.with_context(ctx).powi(n as u64));
                }
                if self.is_zero() {
                    return Err(StatsError::domain("pow", "zero to a negative power"));
                }
                return Ok(ctx.one() / self.with_context(ctx).powi(n.unsigned_abs()));
            }
        }
        if self.is_zero() {
            return if exponent.is_positive() {
                Ok(Decimal::zero(ctx))
            } else {
                Err(StatsError::domain("pow", "zero to a negative power"))
            };
        }
        if self.is_negative() {
            return Err(StatsError::domain("pow", self));
        }
        // exp amplifies the absolute error of y ln x into relative error
        let magnitude = exponent.adjusted_exponent().max(0) as u64
            + u64::from(decimal_width(self.adjusted_exponent().unsigned_abs()));
        let w = ctx.widen(GUARD_DIGITS + decimal_width(magnitude) + magnitude.min(64) as u32);
        let product = self.with_context(w).ln()? * exponent.with_context(w);
        Ok(product.exp()?.with_context(ctx))
    }

    /// Inverse hyperbolic tangent, `|x| < 1`
    pub fn atanh(&self) -> StatsResult<Decimal> {
        let ctx = self.ctx;
        let w = ctx.working();
        let x = self.with_context(w);
        let one = w.one();
        if x.abs() >= one {
            return Err(StatsError::domain("atanh", self));
        }
        // atanh(x) = ln(1 + 2x / (1 - x)) / 2
        let ratio = (&x * 2) / (one - &x);
        Ok((ratio.ln_1p()? / 2).with_context(ctx))
    }

    /// Hyperbolic tangent
    pub fn tanh(&self) -> StatsResult<Decimal> {
        let ctx = self.ctx;
        if self.is_zero() {
            return Ok(Decimal::zero(ctx));
        }
        let w = ctx.working();
        let x = self.with_context(w).abs();
        // Beyond this e^(-2|x|) is below half an ulp
        let saturation = w.int((i64::from(ctx.digits()) + 2) * 6 / 5 + 1);
        let magnitude = if x > saturation {
            w.one()
        } else {
            let t = (x * -2).exp_m1()?;
            -(&t) / (t + 2)
        };
        let signed = if self.is_negative() { -magnitude } else { magnitude };
        Ok(signed.with_context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PI_60: &str = "3.14159265358979323846264338327950288419716939937510582097494";
    const E_60: &str = "2.71828182845904523536028747135266249775724709369995957496697";
    const LN2_60: &str = "0.693147180559945309417232121458176568075500134360255254120680";
    const SQRT2_60: &str = "1.41421356237309504880168872420969807856967187537694807317668";

    fn ctx() -> PrecisionContext {
        PrecisionContext::default()
    }

    fn reference(literal: &str) -> Decimal {
        ctx().parse(literal).unwrap()
    }

    /// |a - b| <= 10^-(digits - 2) * |b|
    fn assert_close(actual: &Decimal, expected: &Decimal, digits: i64) {
        let diff = (actual - expected).abs();
        let tolerance = expected.abs() * ctx().pow10(-(digits - 2));
        assert!(
            diff <= tolerance,
            "actual {} expected {} diff {}",
            actual,
            expected,
            diff
        );
    }

    #[test]
    fn test_constants() {
        assert_close(&Decimal::pi(ctx()), &reference(PI_60), 50);
        assert_close(&Decimal::ln2(ctx()), &reference(LN2_60), 50);
        assert_close(&ctx().one().exp().unwrap(), &reference(E_60), 50);
    }

    #[test]
    fn test_sqrt() {
        assert_close(&ctx().int(2).sqrt().unwrap(), &reference(SQRT2_60), 50);
        assert_eq!(ctx().int(144).sqrt().unwrap(), ctx().int(12));
        assert_eq!(ctx().parse("0.0001").unwrap().sqrt().unwrap(), ctx().parse("0.01").unwrap());
        assert!(ctx().int(-1).sqrt().is_err());
    }

    #[test]
    fn test_ln_exp_inverse() {
        for literal in ["0.5", "1.0001", "3", "1e-30", "12345.678", "0.999999"] {
            let x = ctx().parse(literal).unwrap();
            let roundtrip = x.ln().unwrap().exp().unwrap();
            assert_close(&roundtrip, &x, 48);
        }
        assert!(ctx().zero().ln().is_err());
    }

    #[test]
    fn test_ln_near_one_keeps_relative_precision() {
        let x = ctx().parse("1.000000000000000000001").unwrap();
        let ln = x.ln().unwrap();
        // ln(1 + e) = e - e^2/2 + e^3/3 - ...
        let e = ctx().parse("1e-21").unwrap();
        let expected = &e - &(&e * &e) / 2 + &(&e * &e * &e) / 3;
        assert_close(&ln, &expected, 48);
    }

    #[test]
    fn test_exp_extremes() {
        let tiny = ctx().int(-1000).exp().unwrap();
        assert!(tiny.is_positive());
        assert_eq!(tiny.adjusted_exponent(), -435);
        assert!(ctx().parse("1e20").unwrap().exp().is_err());
    }

    #[test]
    fn test_expm1_and_ln1p_small_arguments() {
        let x = ctx().parse("1e-40").unwrap();
        assert_close(&x.exp_m1().unwrap(), &x, 48);
        assert_close(&x.ln_1p().unwrap(), &x, 48);
        assert!(ctx().int(-1).ln_1p().is_err());
    }

    #[test]
    fn test_pow_and_powi() {
        assert_eq!(ctx().int(2).powi(10), ctx().int(1024));
        let x = ctx().int(2).pow(&ctx().parse("0.5").unwrap()).unwrap();
        assert_close(&x, &reference(SQRT2_60), 50);
        let inv = ctx().int(2).pow(&ctx().int(-2)).unwrap();
        assert_eq!(inv, ctx().parse("0.25").unwrap());
        assert!(ctx().int(-2).pow(&ctx().parse("0.5").unwrap()).is_err());
        assert_eq!(ctx().int(-2).pow(&ctx().int(3)).unwrap(), ctx().int(-8));
    }

    #[test]
    fn test_atanh_tanh() {
        let x = ctx().parse("0.75").unwrap();
        let back = x.atanh().unwrap().tanh().unwrap();
        assert_close(&back, &x, 48);
        assert!(ctx().one().atanh().is_err());
        assert_eq!(ctx().int(500).tanh().unwrap(), ctx().one());
        assert_eq!(ctx().int(-500).tanh().unwrap(), ctx().int(-1));
        let small = ctx().parse("1e-30").unwrap();
        assert_close(&small.tanh().unwrap(), &small, 48);
    }
}
