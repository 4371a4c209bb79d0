//! Gamma function family
//!
//! `ln_gamma` uses the Stirling series with exact Bernoulli coefficients,
//! shifting small arguments upward with the recurrence
//! `Γ(x) = Γ(x + m) / (x (x+1) ... (x+m-1))`.

use std::sync::OnceLock;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use super::{epsilon, exp_or_zero, magnitude_digits, tiny, widest, MAX_ITERATIONS};
use crate::decimal::Decimal;
use crate::precision::GUARD_DIGITS;
use crate::{StatsError, StatsResult};

/// Number of Stirling correction terms (B_2 .. B_80)
const STIRLING_TERMS: usize = 40;

/// Largest integer argument for which `gamma` is an exact factorial
const EXACT_FACTORIAL_LIMIT: i64 = 1000;

fn reduce(num: BigInt, den: BigInt) -> (BigInt, BigInt) {
    if num.is_zero() {
        return (num, BigInt::one());
    }
    let g = num.gcd(&den);
    (num / &g, den / &g)
}

/// Even Bernoulli numbers B_2, B_4, ... as reduced fractions
/// (Akiyama-Tanigawa).
fn bernoulli_numbers() -> &'static [(BigInt, BigInt)] {
    static TABLE: OnceLock<Vec<(BigInt, BigInt)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let n = 2 * STIRLING_TERMS;
        let mut row: Vec<(BigInt, BigInt)> = Vec::with_capacity(n + 1);
        let mut even = Vec::with_capacity(STIRLING_TERMS);
        for m in 0..=n {
            row.push((BigInt::one(), BigInt::from(m + 1)));
            for j in (1..=m).rev() {
                let (n1, d1) = &row[j - 1];
                let (n2, d2) = &row[j];
                let num = (n1 * d2 - n2 * d1) * BigInt::from(j);
                let den = d1 * d2;
                row[j - 1] = reduce(num, den);
            }
            if m >= 2 && m % 2 == 0 {
                even.push(row[0].clone());
            }
        }
        even
    })
}

/// Smallest argument at which the truncated Stirling series reaches
/// `digits` digits.
fn stirling_threshold(digits: u32) -> u64 {
    let exponent = (52.0 + f64::from(digits)) / (2 * STIRLING_TERMS - 1) as f64;
    (10f64.powf(exponent).ceil() as u64).max(10)
}

/// ln Γ(x) for x > 0
pub fn ln_gamma(x: &Decimal) -> StatsResult<Decimal> {
    if !x.is_positive() {
        return Err(StatsError::domain("ln_gamma", x));
    }
    let ctx = x.context();
    let w = ctx.widen(GUARD_DIGITS + 5);
    let threshold = w.uint(stirling_threshold(w.digits()));

    let mut z = x.with_context(w);
    let mut product = w.one();
    let mut shifted = false;
    while z < threshold {
        product *= &z;
        z = &z + 1;
        shifted = true;
    }

    let half = w.one() / 2;
    let ln_z = z.ln()?;
    let half_ln_two_pi = (Decimal::pi(w) * 2).ln()? / 2;
    let mut result = (&z - &half) * &ln_z - &z + half_ln_two_pi;

    let z2 = &z * &z;
    let mut z_power = z.clone();
    for (k, (num, den)) in bernoulli_numbers().iter().enumerate() {
        let order = 2 * (k as i64 + 1);
        let coefficient = Decimal::from_bigint(num.clone(), w)
            / (Decimal::from_bigint(den.clone(), w) * (order * (order - 1)));
        let term = coefficient / &z_power;
        if term.negligible_against(&result, w.digits()) {
            break;
        }
        result += term;
        z_power = &z_power * &z2;
    }

    if shifted {
        result -= product.ln()?;
    }
    Ok(result.with_context(ctx))
}

/// Γ(x) for x > 0; positive integers up to 1000 are exact factorials
pub fn gamma(x: &Decimal) -> StatsResult<Decimal> {
    if !x.is_positive() {
        return Err(StatsError::domain("gamma", x));
    }
    let ctx = x.context();
    if x.is_integer() {
        if let Some(n) = x.round_to_i64().filter(|n| *n <= EXACT_FACTORIAL_LIMIT) {
            let factorial = (1..n).fold(BigUint::one(), |acc, k| acc * BigUint::from(k as u64));
            return Ok(Decimal::from_biguint(factorial, ctx));
        }
    }
    let w = ctx.widen(GUARD_DIGITS + magnitude_digits(x));
    Ok(ln_gamma(&x.with_context(w))?.exp()?.with_context(ctx))
}

/// P(a, x) and Q(a, x) = 1 - P(a, x), each computed without cancellation
/// in its own tail.
pub(crate) fn gamma_pq(a: &Decimal, x: &Decimal) -> StatsResult<(Decimal, Decimal)> {
    if !a.is_positive() {
        return Err(StatsError::domain("regularized_gamma", a));
    }
    if x.is_negative() {
        return Err(StatsError::domain("regularized_gamma", x));
    }
    let ctx = widest(&[a, x]);
    if x.is_zero() {
        return Ok((ctx.zero(), ctx.one()));
    }
    let w = ctx.widen(GUARD_DIGITS + magnitude_digits(a).max(magnitude_digits(x)));
    let a = a.with_context(w);
    let x = x.with_context(w);
    let log_front = &a * x.ln()? - &x - ln_gamma(&a)?;
    let front = exp_or_zero(&log_front)?;

    if x < &a + 1 {
        // Series for P
        let mut ap = a.clone();
        let mut term = w.one() / &a;
        let mut sum = term.clone();
        for _ in 0..MAX_ITERATIONS {
            ap = &ap + 1;
            term = term * &x / &ap;
            sum += &term;
            if term.negligible_against(&sum, w.digits()) {
                let p = front * sum;
                let q = w.one() - &p;
                return Ok((p.with_context(ctx), q.with_context(ctx)));
            }
        }
        tracing::warn!(a = %a, x = %x, "incomplete gamma series did not converge");
        return Err(StatsError::ConvergenceFailure {
            algorithm: "incomplete gamma series",
            iterations: MAX_ITERATIONS,
        });
    }

    // Continued fraction for Q (modified Lentz)
    let eps = epsilon(w);
    let floor = tiny(w);
    let guard = |v: Decimal| if v.abs() < floor { floor.clone() } else { v };
    let mut b = &x + 1 - &a;
    let mut c = w.one() / &floor;
    let mut d = w.one() / &b;
    let mut h = d.clone();
    for i in 1..=MAX_ITERATIONS as i64 {
        let an = (&a - i) * i;
        b = &b + 2;
        d = w.one() / guard(&an * &d + &b);
        c = guard(&b + &an / &c);
        let delta = &d * &c;
        h *= &delta;
        if (delta - 1).abs() <= eps {
            let q = front * h;
            let p = w.one() - &q;
            return Ok((p.with_context(ctx), q.with_context(ctx)));
        }
    }
    tracing::warn!(a = %a, x = %x, "incomplete gamma continued fraction did not converge");
    Err(StatsError::ConvergenceFailure {
        algorithm: "incomplete gamma continued fraction",
        iterations: MAX_ITERATIONS,
    })
}

/// Regularized lower incomplete gamma P(a, x)
pub fn regularized_gamma_p(a: &Decimal, x: &Decimal) -> StatsResult<Decimal> {
    Ok(gamma_pq(a, x)?.0)
}

/// Regularized upper incomplete gamma Q(a, x)
pub fn regularized_gamma_q(a: &Decimal, x: &Decimal) -> StatsResult<Decimal> {
    Ok(gamma_pq(a, x)?.1)
}
