//! Exact combinatorics and discrete probability mass functions
//!
//! Coefficients are exact big integers; they are converted to [`Decimal`]
//! only once, when a probability is formed.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::{StatsError, StatsResult};

/// `n!` exactly
pub fn factorial(n: u64) -> BigUint {
    (2..=n).fold(BigUint::one(), |acc, i| acc * i)
}

/// `C(n, k)` exactly; zero when `k > n`
pub fn binomial_exact(n: u64, k: u64) -> BigUint {
    if k > n {
        return BigUint::zero();
    }
    let k = k.min(n - k);
    let mut result = BigUint::one();
    for i in 1..=k {
        // Each prefix product is itself a binomial coefficient, so the
        // division is exact.
        result = result * (n - k + i) / i;
    }
    result
}

/// `C(n, k)` as a decimal; zero when `k > n`
pub fn binomial_coefficient(n: u64, k: u64, ctx: PrecisionContext) -> Decimal {
    Decimal::from_biguint(binomial_exact(n, k), ctx)
}

/// Unnormalized hypergeometric weight `C(n1, x) C(n2, n - x)`
pub(crate) fn hypergeometric_weight(x: u64, n1: u64, n2: u64, n: u64) -> BigUint {
    if x > n {
        return BigUint::zero();
    }
    binomial_exact(n1, x) * binomial_exact(n2, n - x)
}

/// Hypergeometric weights for every `x` in `lo..=hi`, by the ratio
/// `w(x + 1) / w(x) = (n1 - x)(n - x) / ((x + 1)(n2 - n + x + 1))`.
/// `lo` must be at least `n - n2`.
pub(crate) fn hypergeometric_weights(lo: u64, hi: u64, n1: u64, n2: u64, n: u64) -> Vec<BigUint> {
    if lo > hi {
        return Vec::new();
    }
    let mut weights = Vec::with_capacity((hi - lo + 1) as usize);
    let mut weight = hypergeometric_weight(lo, n1, n2, n);
    for x in lo..hi {
        let next = &weight * (n1 - x) * (n - x) / ((x + 1) * (n2 + x + 1 - n));
        weights.push(weight);
        weight = next;
    }
    weights.push(weight);
    weights
}

/// P(X = x) when drawing `n` items without replacement from `n1` marked
/// and `n2` unmarked items.
pub fn hypergeometric_pmf(x: u64, n1: u64, n2: u64, n: u64, ctx: PrecisionContext) -> StatsResult<Decimal> {
    let total = n1 + n2;
    if n > total {
        return Err(StatsError::InvalidArgument(format!(
            "cannot draw {} items from a population of {}",
            n, total
        )));
    }
    let weight = hypergeometric_weight(x, n1, n2, n);
    if weight.is_zero() {
        return Ok(ctx.zero());
    }
    Decimal::from_ratio(&weight, &binomial_exact(total, n), ctx)
}

fn check_probability(p: &Decimal) -> StatsResult<()> {
    if p.is_negative() || *p > p.context().one() {
        return Err(StatsError::InvalidArgument(format!(
            "probability must lie in [0, 1], got {}",
            p
        )));
    }
    Ok(())
}

/// P(X = k) for X ~ Binomial(n, p)
pub fn binomial_pmf(k: u64, n: u64, p: &Decimal, ctx: PrecisionContext) -> StatsResult<Decimal> {
    check_probability(p)?;
    if k > n {
        return Ok(ctx.zero());
    }
    let w = ctx.merge(&p.context()).working();
    let p = p.with_context(w);
    let q = w.one() - &p;
    let value = binomial_coefficient(n, k, w) * p.powi(k) * q.powi(n - k);
    Ok(value.with_context(ctx))
}

/// Multinomial coefficient `n! / (c_1! ... c_k!)`
pub fn multinomial_exact(counts: &[u64]) -> BigUint {
    let mut remaining = 0u64;
    counts.iter().fold(BigUint::one(), |acc, &c| {
        remaining += c;
        acc * binomial_exact(remaining, c)
    })
}

/// Probability of observing `counts` in `sum(counts)` independent draws
/// with category probabilities `probs`.
pub fn multinomial_pmf(counts: &[u64], probs: &[Decimal], ctx: PrecisionContext) -> StatsResult<Decimal> {
    if counts.len() != probs.len() {
        return Err(StatsError::ShapeMismatch(format!(
            "{} counts but {} probabilities",
            counts.len(),
            probs.len()
        )));
    }
    if counts.is_empty() {
        return Err(StatsError::EmptyInput { field: "counts" });
    }
    for p in probs {
        check_probability(p)?;
    }
    let w = ctx.working();
    let mut value = Decimal::from_biguint(multinomial_exact(counts), w);
    for (&count, p) in counts.iter().zip(probs) {
        value *= p.with_context(w).powi(count);
    }
    Ok(value.with_context(ctx))
}
