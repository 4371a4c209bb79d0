//! Arbitrary-precision decimal numbers
//!
//! A [`Decimal`] is `mantissa × 10^exponent` with a big-integer mantissa. Each
//! value carries the [`PrecisionContext`] it was produced under and every
//! operation rounds its exact result back to at most `digits` significant
//! digits. Binary operations use the wider of the two operand contexts, so
//! mixing a working-precision value with a caller-precision value never
//! loses digits.

mod elementary;

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{StatsError, StatsResult};
use crate::precision::{PrecisionContext, DEFAULT_DIGITS};

/// `10^n` as a big unsigned integer
pub(crate) fn pow10_big(n: u32) -> BigUint {
    BigUint::from(10u32).pow(n)
}

/// Number of decimal digits of a magnitude (zero has one digit)
pub(crate) fn digit_count(magnitude: &BigUint) -> u32 {
    if magnitude.is_zero() {
        return 1;
    }
    // floor((bits - 1) * log10(2)) never exceeds floor(log10(m)); one digit
    // of slack absorbs float error and the loop below settles the rest.
    let estimate = ((magnitude.bits() - 1) as f64 * std::f64::consts::LOG10_2) as u32;
    let mut digits = estimate.max(1);
    let mut bound = pow10_big(digits);
    while *magnitude >= bound {
        digits += 1;
        bound *= 10u32;
    }
    digits
}

/// Round an exact `mantissa × 10^exponent` to the context
fn normalize(mantissa: BigInt, exponent: i64, ctx: PrecisionContext) -> Decimal {
    if mantissa.is_zero() {
        return Decimal::zero(ctx);
    }
    let (sign, magnitude) = mantissa.into_parts();
    let digits = digit_count(&magnitude);
    if digits <= ctx.digits() {
        return Decimal {
            mantissa: BigInt::from_biguint(sign, magnitude),
            exponent,
            ctx,
        };
    }

    let shift = digits - ctx.digits();
    let divisor = pow10_big(shift);
    let (mut kept, remainder) = magnitude.div_rem(&divisor);
    let doubled = &remainder + &remainder;
    if ctx.rounding().increments(
        sign == Sign::Minus,
        kept.is_odd(),
        !remainder.is_zero(),
        doubled.cmp(&divisor),
    ) {
        kept += 1u32;
    }

    let mut exponent = exponent + i64::from(shift);
    // 99..9 rounded up to 100..0 gained a digit; dropping the zero is exact
    if digit_count(&kept) > ctx.digits() {
        kept /= 10u32;
        exponent += 1;
    }
    Decimal {
        mantissa: BigInt::from_biguint(sign, kept),
        exponent,
        ctx,
    }
}

/// Arbitrary-precision decimal value
#[derive(Clone)]
pub struct Decimal {
    mantissa: BigInt,
    exponent: i64,
    ctx: PrecisionContext,
}

impl Decimal {
    // Construction

    pub fn zero(ctx: PrecisionContext) -> Self {
        Decimal {
            mantissa: BigInt::zero(),
            exponent: 0,
            ctx,
        }
    }

    pub fn from_i64(value: i64, ctx: PrecisionContext) -> Self {
        normalize(BigInt::from(value), 0, ctx)
    }

    pub fn from_u64(value: u64, ctx: PrecisionContext) -> Self {
        normalize(BigInt::from(value), 0, ctx)
    }

    /// Exact big integer, rounded to the context
    pub fn from_bigint(value: BigInt, ctx: PrecisionContext) -> Self {
        normalize(value, 0, ctx)
    }

    /// Exact big unsigned integer, rounded to the context
    pub fn from_biguint(value: BigUint, ctx: PrecisionContext) -> Self {
        normalize(BigInt::from_biguint(Sign::Plus, value), 0, ctx)
    }

    /// Exact ratio of two big integers, correctly rounded
    pub fn from_ratio(numerator: &BigUint, denominator: &BigUint, ctx: PrecisionContext) -> StatsResult<Self> {
        if denominator.is_zero() {
            return Err(StatsError::domain("ratio", "division by zero"));
        }
        let num = Decimal {
            mantissa: BigInt::from_biguint(Sign::Plus, numerator.clone()),
            exponent: 0,
            ctx,
        };
        let den = Decimal {
            mantissa: BigInt::from_biguint(Sign::Plus, denominator.clone()),
            exponent: 0,
            ctx,
        };
        Ok(div_ref(&num, &den))
    }

    /// `10^exponent`
    pub fn pow10(exponent: i64, ctx: PrecisionContext) -> Self {
        Decimal {
            mantissa: BigInt::from(1),
            exponent,
            ctx,
        }
    }

    /// Parse a decimal literal and round it to `ctx`
    pub fn parse(literal: &str, ctx: PrecisionContext) -> StatsResult<Self> {
        let (mantissa, exponent) = parse_parts(literal)?;
        Ok(normalize(mantissa, exponent, ctx))
    }

    /// Finite float through its shortest round-trip decimal representation,
    /// so `0.1` becomes exactly `0.1` rather than its binary expansion.
    pub fn from_f64(value: f64, ctx: PrecisionContext) -> StatsResult<Self> {
        if !value.is_finite() {
            return Err(StatsError::NonFiniteInput { index: 0, value });
        }
        Self::parse(&format!("{:e}", value), ctx)
    }

    // Inspection

    pub fn context(&self) -> PrecisionContext {
        self.ctx
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    /// -1, 0 or 1
    pub fn signum(&self) -> i32 {
        match self.mantissa.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Exponent of the most significant digit (`floor(log10 |x|)`);
    /// `i64::MIN` for zero.
    pub fn adjusted_exponent(&self) -> i64 {
        if self.is_zero() {
            return i64::MIN;
        }
        self.exponent
            .saturating_add(i64::from(digit_count(self.mantissa.magnitude())))
            .saturating_sub(1)
    }

    /// True when the value has no fractional part
    pub fn is_integer(&self) -> bool {
        if self.exponent >= 0 || self.is_zero() {
            return true;
        }
        let scale = self.exponent.unsigned_abs();
        if scale > u64::from(digit_count(self.mantissa.magnitude())) {
            return false;
        }
        (self.mantissa.magnitude() % pow10_big(scale as u32)).is_zero()
    }

    /// Nearest integer (ties away from zero), if it fits in an `i64`
    pub fn round_to_i64(&self) -> Option<i64> {
        if self.is_zero() {
            return Some(0);
        }
        if self.adjusted_exponent() > 18 {
            return None;
        }
        let magnitude = if self.exponent >= 0 {
            self.mantissa.magnitude() * pow10_big(self.exponent as u32)
        } else {
            let scale = self.exponent.unsigned_abs();
            if scale > u64::from(digit_count(self.mantissa.magnitude())) + 1 {
                // |x| < 0.1
                return Some(0);
            }
            let divisor = pow10_big(scale as u32);
            let (mut q, r) = self.mantissa.magnitude().div_rem(&divisor);
            if &r + &r >= divisor {
                q += 1u32;
            }
            q
        };
        let value = magnitude.to_i64()?;
        Some(if self.is_negative() { -value } else { value })
    }

    /// Lossy conversion for reporting and seeding iterations
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse::<f64>()
            .unwrap_or(f64::NAN)
    }

    // Precision management

    /// The same value rounded to another context
    pub fn with_context(&self, ctx: PrecisionContext) -> Self {
        normalize(self.mantissa.clone(), self.exponent, ctx)
    }

    /// Multiply by `10^shift` (exact)
    pub fn scale10(&self, shift: i64) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        Decimal {
            mantissa: self.mantissa.clone(),
            exponent: self.exponent + shift,
            ctx: self.ctx,
        }
    }

    /// True when `self` is below `reference` by more than `digits` orders
    /// of magnitude, i.e. adding it would not change a `digits`-digit sum.
    pub(crate) fn negligible_against(&self, reference: &Decimal, digits: u32) -> bool {
        if self.is_zero() {
            return true;
        }
        if reference.is_zero() {
            return false;
        }
        self.adjusted_exponent() < reference.adjusted_exponent() - i64::from(digits) - 1
    }

    pub fn abs(&self) -> Self {
        Decimal {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
            ctx: self.ctx,
        }
    }

    /// Division that reports a zero divisor instead of panicking
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Self> {
        if rhs.is_zero() {
            None
        } else {
            Some(div_ref(self, rhs))
        }
    }

    /// Clamp into `[lo, hi]`
    pub fn clamp_to(&self, lo: &Decimal, hi: &Decimal) -> Self {
        if self < lo {
            lo.with_context(self.ctx)
        } else if self > hi {
            hi.with_context(self.ctx)
        } else {
            self.clone()
        }
    }
}

/// Largest adjusted exponent accepted from text
pub const MAX_EXPONENT: i64 = 100_000_000_000_000_000;

fn parse_parts(literal: &str) -> StatsResult<(BigInt, i64)> {
    let invalid = || StatsError::InvalidArgument(format!("'{}' is not a decimal number", literal));
    let text = literal.trim();

    let (body, mut exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(pos) => {
            let exp = text[pos + 1..].parse::<i64>().map_err(|_| invalid())?;
            (&text[..pos], exp)
        }
        None => (text, 0),
    };

    let (negative, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body.strip_prefix('+').unwrap_or(body)),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let digits = format!("{}{}", int_part, frac_part);
    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
    if magnitude.is_zero() {
        return Ok((BigInt::zero(), 0));
    }
    let out_of_range = || {
        StatsError::InvalidArgument(format!(
            "exponent of '{}' lies outside ±{}",
            literal, MAX_EXPONENT
        ))
    };
    exponent = i64::try_from(frac_part.len())
        .ok()
        .and_then(|shift| exponent.checked_sub(shift))
        .ok_or_else(out_of_range)?;
    let adjusted = i64::try_from(digits.len())
        .ok()
        .and_then(|width| exponent.checked_add(width))
        .ok_or_else(out_of_range)?;
    if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&adjusted) {
        return Err(out_of_range());
    }
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok((BigInt::from_biguint(sign, magnitude), exponent))
}

// Arithmetic kernels

fn add_ref(a: &Decimal, b: &Decimal) -> Decimal {
    let ctx = a.ctx.merge(&b.ctx);
    if a.is_zero() {
        return b.with_context(ctx);
    }
    if b.is_zero() {
        return a.with_context(ctx);
    }

    let (hi, lo) = if a.adjusted_exponent() >= b.adjusted_exponent() {
        (a, b)
    } else {
        (b, a)
    };
    // An operand more than `digits + 2` orders below the other only matters
    // for rounding direction; a single sticky unit stands in for it.
    let limit = i64::from(ctx.digits()) + 2;
    let sticky;
    let lo = if hi.adjusted_exponent() - lo.adjusted_exponent() > limit {
        let floor = hi.exponent.min(hi.adjusted_exponent() - limit) - 1;
        sticky = Decimal {
            mantissa: BigInt::from(lo.signum()),
            exponent: floor,
            ctx,
        };
        &sticky
    } else {
        lo
    };

    let exponent = hi.exponent.min(lo.exponent);
    let align = |d: &Decimal| -> BigInt {
        let shift = (d.exponent - exponent) as u32;
        if shift == 0 {
            d.mantissa.clone()
        } else {
            &d.mantissa * BigInt::from(pow10_big(shift))
        }
    };
    normalize(align(hi) + align(lo), exponent, ctx)
}

fn sub_ref(a: &Decimal, b: &Decimal) -> Decimal {
    add_ref(a, &neg_ref(b))
}

fn mul_ref(a: &Decimal, b: &Decimal) -> Decimal {
    let ctx = a.ctx.merge(&b.ctx);
    if a.is_zero() || b.is_zero() {
        return Decimal::zero(ctx);
    }
    normalize(&a.mantissa * &b.mantissa, a.exponent + b.exponent, ctx)
}

fn div_ref(a: &Decimal, b: &Decimal) -> Decimal {
    assert!(!b.is_zero(), "decimal division by zero");
    let ctx = a.ctx.merge(&b.ctx);
    if a.is_zero() {
        return Decimal::zero(ctx);
    }
    let da = i64::from(digit_count(a.mantissa.magnitude()));
    let db = i64::from(digit_count(b.mantissa.magnitude()));
    // Quotient gets at least digits + 2 digits before rounding
    let shift = (i64::from(ctx.digits()) + 2 + db - da).max(0);
    let numerator = a.mantissa.magnitude() * pow10_big(shift as u32);
    let (quotient, remainder) = numerator.div_rem(b.mantissa.magnitude());
    let (quotient, sticky) = if remainder.is_zero() {
        (quotient, 0)
    } else {
        (quotient * 10u32 + 1u32, 1)
    };
    let sign = if a.is_negative() == b.is_negative() {
        Sign::Plus
    } else {
        Sign::Minus
    };
    normalize(
        BigInt::from_biguint(sign, quotient),
        a.exponent - shift - b.exponent - sticky,
        ctx,
    )
}

fn neg_ref(a: &Decimal) -> Decimal {
    Decimal {
        mantissa: -&a.mantissa,
        exponent: a.exponent,
        ctx: a.ctx,
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $kernel:ident) => {
        impl<'a, 'b> $trait<&'b Decimal> for &'a Decimal {
            type Output = Decimal;
            fn $method(self, rhs: &'b Decimal) -> Decimal {
                $kernel(self, rhs)
            }
        }

        impl<'a> $trait<&'a Decimal> for Decimal {
            type Output = Decimal;
            fn $method(self, rhs: &'a Decimal) -> Decimal {
                $kernel(&self, rhs)
            }
        }

        impl<'a> $trait<Decimal> for &'a Decimal {
            type Output = Decimal;
            fn $method(self, rhs: Decimal) -> Decimal {
                $kernel(self, &rhs)
            }
        }

        impl $trait<Decimal> for Decimal {
            type Output = Decimal;
            fn $method(self, rhs: Decimal) -> Decimal {
                $kernel(&self, &rhs)
            }
        }

        impl<'a> $trait<i64> for &'a Decimal {
            type Output = Decimal;
            fn $method(self, rhs: i64) -> Decimal {
                $kernel(self, &Decimal::from_i64(rhs, self.ctx))
            }
        }

        impl $trait<i64> for Decimal {
            type Output = Decimal;
            fn $method(self, rhs: i64) -> Decimal {
                $kernel(&self, &Decimal::from_i64(rhs, self.ctx))
            }
        }

        impl<'a> $assign_trait<&'a Decimal> for Decimal {
            fn $assign_method(&mut self, rhs: &'a Decimal) {
                *self = $kernel(self, rhs);
            }
        }

        impl $assign_trait<Decimal> for Decimal {
            fn $assign_method(&mut self, rhs: Decimal) {
                *self = $kernel(self, &rhs);
            }
        }
    };
}

forward_binop!(Add, add, AddAssign, add_assign, add_ref);
forward_binop!(Sub, sub, SubAssign, sub_assign, sub_ref);
forward_binop!(Mul, mul, MulAssign, mul_assign, mul_ref);
forward_binop!(Div, div, DivAssign, div_assign, div_ref);

impl Neg for Decimal {
    type Output = Decimal;
    fn neg(self) -> Decimal {
        neg_ref(&self)
    }
}

impl<'a> Neg for &'a Decimal {
    type Output = Decimal;
    fn neg(self) -> Decimal {
        neg_ref(self)
    }
}

// Ordering

fn compare_magnitude(a: &Decimal, b: &Decimal) -> Ordering {
    let (adj_a, adj_b) = (a.adjusted_exponent(), b.adjusted_exponent());
    if adj_a != adj_b {
        return adj_a.cmp(&adj_b);
    }
    let exponent = a.exponent.min(b.exponent);
    let align = |d: &Decimal| d.mantissa.magnitude() * pow10_big((d.exponent - exponent) as u32);
    align(a).cmp(&align(b))
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.signum().cmp(&other.signum()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match self.signum() {
            0 => Ordering::Equal,
            1 => compare_magnitude(self, other),
            _ => compare_magnitude(self, other).reverse(),
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

// Formatting

impl fmt::Display for Decimal {
    /// Always prints exactly `digits` significant digits; plain notation
    /// unless the value is very large or very small.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.ctx.digits() as usize;
        if self.is_zero() {
            if precision <= 1 {
                return f.write_str("0");
            }
            return write!(f, "0.{}", "0".repeat(precision - 1));
        }

        let mut digits = self.mantissa.magnitude().to_string();
        let mut exponent = self.exponent;
        if digits.len() < precision {
            let pad = precision - digits.len();
            digits.push_str(&"0".repeat(pad));
            exponent -= pad as i64;
        }
        let sign = if self.is_negative() { "-" } else { "" };
        let adjusted = exponent + digits.len() as i64 - 1;

        if exponent <= 0 && adjusted >= -6 {
            let int_len = digits.len() as i64 + exponent;
            if int_len > 0 {
                let (int_part, frac_part) = digits.split_at(int_len as usize);
                if frac_part.is_empty() {
                    write!(f, "{}{}", sign, int_part)
                } else {
                    write!(f, "{}{}.{}", sign, int_part, frac_part)
                }
            } else {
                write!(f, "{}0.{}{}", sign, "0".repeat((-int_len) as usize), digits)
            }
        } else {
            let (lead, rest) = digits.split_at(1);
            let exp_sign = if adjusted >= 0 { "+" } else { "-" };
            if rest.is_empty() {
                write!(f, "{}{}E{}{}", sign, lead, exp_sign, adjusted.unsigned_abs())
            } else {
                write!(f, "{}{}.{}E{}{}", sign, lead, rest, exp_sign, adjusted.unsigned_abs())
            }
        }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({})", self)
    }
}

impl FromStr for Decimal {
    type Err = StatsError;

    /// Parses with the default context widened to keep every digit of the
    /// literal.
    fn from_str(s: &str) -> StatsResult<Self> {
        let (mantissa, exponent) = parse_parts(s)?;
        let literal_digits = digit_count(mantissa.magnitude());
        let ctx = PrecisionContext::default().widen(literal_digits.saturating_sub(DEFAULT_DIGITS));
        Ok(normalize(mantissa, exponent, ctx))
    }
}

// Serialization: decimal strings, never binary floats

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from_i64(v, PrecisionContext::default()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from_u64(v, PrecisionContext::default()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        Decimal::from_f64(v, PrecisionContext::default()).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
