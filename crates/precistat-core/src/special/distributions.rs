//! Continuous distributions used by the test kernels
//!
//! Normal, Student t, F and chi-square CDF, survival function, density and
//! quantile. Survival functions are evaluated directly from the tail that
//! is small, never as `1 - cdf`. Quantiles bracket the root and polish it
//! with Newton steps, falling back to bisection whenever a step would leave
//! the bracket.

use super::beta::{beta_pair, ln_beta};
use super::gamma::{gamma_pq, ln_gamma};
use super::{exp_or_zero, widest};
use crate::decimal::Decimal;
use crate::{StatsError, StatsResult};

const QUANTILE_ITERATIONS: usize = 400;

// Acklam's rational approximation, used only to seed Newton iterations
const ACKLAM_A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const ACKLAM_B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const ACKLAM_C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549671010115819e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const ACKLAM_D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const ACKLAM_P_LOW: f64 = 0.02425;

fn acklam(p: f64) -> f64 {
    let tail = |q: f64| {
        let (c, d) = (ACKLAM_C, ACKLAM_D);
        (((((c[0] * q + c[1]) * q + c[2]) * q + c[3]) * q + c[4]) * q + c[5])
            / ((((d[0] * q + d[1]) * q + d[2]) * q + d[3]) * q + 1.0)
    };
    if p < ACKLAM_P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - ACKLAM_P_LOW {
        let (a, b) = (ACKLAM_A, ACKLAM_B);
        let q = p - 0.5;
        let r = q * q;
        (((((a[0] * r + a[1]) * r + a[2]) * r + a[3]) * r + a[4]) * r + a[5]) * q
            / (((((b[0] * r + b[1]) * r + b[2]) * r + b[3]) * r + b[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Upper standard-normal quantile seed for a lower-tail probability
/// `q <= 0.5`, as a positive `f64`.
fn normal_tail_seed(q: &Decimal) -> StatsResult<f64> {
    let approx = q.to_f64();
    if approx > 0.0 && approx.is_finite() {
        return Ok(-acklam(approx));
    }
    // Below f64 range: z ≈ sqrt(-2 ln q)
    Ok((q.ln()? * -2).to_f64().sqrt())
}

/// Solve `sf(x) = target` for `x > 0` where `sf` decreases from above
/// `target` at zero.
fn invert_upper_tail<S, D>(target: &Decimal, seed: f64, sf: S, pdf: D) -> StatsResult<Decimal>
where
    S: Fn(&Decimal) -> StatsResult<Decimal>,
    D: Fn(&Decimal) -> StatsResult<Decimal>,
{
    refine_upper_tail(target, seed, sf, pdf).map(|(x, _)| x)
}

/// Root and the number of refinement iterations spent on it
fn refine_upper_tail<S, D>(target: &Decimal, seed: f64, sf: S, pdf: D) -> StatsResult<(Decimal, usize)>
where
    S: Fn(&Decimal) -> StatsResult<Decimal>,
    D: Fn(&Decimal) -> StatsResult<Decimal>,
{
    let w = target.context();
    let tolerance = w.pow10(-(i64::from(w.digits()) - 2));
    let residual_limit = target * &tolerance;
    let mut x = if seed.is_finite() && seed > 0.0 {
        w.from_f64(seed)?
    } else {
        w.one()
    };

    let mut lo = w.zero();
    let mut hi = x.clone();
    let mut expansions = 0;
    while sf(&hi)? > *target {
        lo = hi.clone();
        hi = &hi * 2;
        expansions += 1;
        if expansions > QUANTILE_ITERATIONS {
            return Err(StatsError::ConvergenceFailure {
                algorithm: "quantile bracketing",
                iterations: expansions,
            });
        }
    }
    if x <= lo || x > hi {
        x = (&lo + &hi) / 2;
    }

    for iteration in 1..=QUANTILE_ITERATIONS {
        let diff = sf(&x)? - target;
        if diff.abs() <= residual_limit {
            return Ok((x, iteration));
        }
        if diff.is_positive() {
            lo = x.clone();
        } else {
            hi = x.clone();
        }
        let density = pdf(&x)?;
        if !density.is_positive() {
            x = (&lo + &hi) / 2;
            continue;
        }
        let step = &diff / &density;
        let candidate = &x + &step;
        // A Newton correction below the tolerance is final, whether or not
        // rounding pushed the candidate onto the bracket edge.
        if step.abs() <= &x.abs() * &tolerance {
            return Ok((candidate, iteration));
        }
        if candidate > lo && candidate < hi {
            x = candidate;
            continue;
        }
        // Newton overshot the bracket: evaluate half the step so the far
        // side moves in before bisecting.
        let reach = &x + &(&step / 2);
        if reach > lo && reach < hi {
            if sf(&reach)? > *target {
                lo = reach;
            } else {
                hi = reach;
            }
        }
        x = (&lo + &hi) / 2;
        if (&hi - &lo) <= &x.abs() * &tolerance {
            return Ok((x, iteration));
        }
    }
    tracing::warn!(probability = %target, "quantile iteration did not converge");
    Err(StatsError::ConvergenceFailure {
        algorithm: "quantile refinement",
        iterations: QUANTILE_ITERATIONS,
    })
}

fn check_probability(p: &Decimal, function: &'static str, allow_zero: bool) -> StatsResult<()> {
    let one = p.context().one();
    if p.is_negative() || (p.is_zero() && !allow_zero) || p >= &one {
        return Err(StatsError::domain(function, p));
    }
    Ok(())
}

fn check_dof(df: &Decimal, function: &'static str) -> StatsResult<()> {
    if !df.is_positive() {
        return Err(StatsError::InvalidArgument(format!(
            "{} requires positive degrees of freedom, got {}",
            function, df
        )));
    }
    Ok(())
}

// Normal

/// `(Φ(z), 1 - Φ(z))`
fn normal_tails(z: &Decimal) -> StatsResult<(Decimal, Decimal)> {
    let ctx = z.context();
    if z.is_zero() {
        let half = ctx.one() / 2;
        return Ok((half.clone(), half));
    }
    let w = ctx.working();
    let z = z.with_context(w);
    let (p, q) = gamma_pq(&(w.one() / 2), &(&z * &z / 2))?;
    let small = (q / 2).with_context(ctx);
    let large = ((p + 1) / 2).with_context(ctx);
    Ok(if z.is_negative() { (small, large) } else { (large, small) })
}

pub fn normal_cdf(z: &Decimal) -> StatsResult<Decimal> {
    Ok(normal_tails(z)?.0)
}

pub fn normal_sf(z: &Decimal) -> StatsResult<Decimal> {
    Ok(normal_tails(z)?.1)
}

pub fn normal_pdf(z: &Decimal) -> StatsResult<Decimal> {
    let ctx = z.context();
    let w = ctx.working();
    let z = z.with_context(w);
    let norm = (Decimal::pi(w) * 2).sqrt()?;
    let density = exp_or_zero(&(-(&z * &z) / 2))? / norm;
    Ok(density.with_context(ctx))
}

/// Φ⁻¹(p) for 0 < p < 1
pub fn normal_inverse_cdf(p: &Decimal) -> StatsResult<Decimal> {
    check_probability(p, "normal_inverse_cdf", false)?;
    let ctx = p.context();
    let w = ctx.working();
    let p = p.with_context(w);
    let half = w.one() / 2;
    if p == half {
        return Ok(ctx.zero());
    }
    let (tail, upper) = if p < half {
        (p.clone(), false)
    } else {
        (w.one() - &p, true)
    };
    let seed = normal_tail_seed(&tail)?;
    let z = invert_upper_tail(&tail, seed, normal_sf, normal_pdf)?;
    let z = if upper { z } else { -z };
    Ok(z.with_context(ctx))
}

// Student t

/// `(F(t), 1 - F(t))` from `I_{ν/(ν+t²)}(ν/2, 1/2)`
fn students_t_tails(t: &Decimal, df: &Decimal) -> StatsResult<(Decimal, Decimal)> {
    check_dof(df, "students_t")?;
    let ctx = widest(&[t, df]);
    let w = ctx.working();
    let (t, df) = (t.with_context(w), df.with_context(w));
    let t2 = &t * &t;
    let denominator = &df + &t2;
    let x = &df / &denominator;
    let y = &t2 / &denominator;
    let (i, complement) = beta_pair(&x, &y, &(&df / 2), &(w.one() / 2))?;
    // P(T > |t|) and P(T <= |t|)
    let tail = i / 2;
    let body = (complement + 1) / 2;
    let (cdf, sf) = if t.is_negative() { (tail, body) } else { (body, tail) };
    Ok((cdf.with_context(ctx), sf.with_context(ctx)))
}

pub fn students_t_cdf(t: &Decimal, df: &Decimal) -> StatsResult<Decimal> {
    Ok(students_t_tails(t, df)?.0)
}

pub fn students_t_sf(t: &Decimal, df: &Decimal) -> StatsResult<Decimal> {
    Ok(students_t_tails(t, df)?.1)
}

pub fn students_t_pdf(t: &Decimal, df: &Decimal) -> StatsResult<Decimal> {
    check_dof(df, "students_t_pdf")?;
    let ctx = widest(&[t, df]);
    let w = ctx.working();
    let (t, df) = (t.with_context(w), df.with_context(w));
    let half_df_plus = (&df + 1) / 2;
    let log_density = ln_gamma(&half_df_plus)? - ln_gamma(&(&df / 2))?
        - (&df * Decimal::pi(w)).ln()? / 2
        - &half_df_plus * (&t * &t / &df).ln_1p()?;
    Ok(exp_or_zero(&log_density)?.with_context(ctx))
}

/// Student t quantile for 0 < p < 1
pub fn students_t_inverse_cdf(p: &Decimal, df: &Decimal) -> StatsResult<Decimal> {
    check_probability(p, "students_t_inverse_cdf", false)?;
    check_dof(df, "students_t_inverse_cdf")?;
    let ctx = widest(&[p, df]);
    let w = ctx.working();
    let p = p.with_context(w);
    let df = df.with_context(w);
    let half = w.one() / 2;
    if p == half {
        return Ok(ctx.zero());
    }
    let (tail, upper) = if p < half {
        (p.clone(), false)
    } else {
        (w.one() - &p, true)
    };
    // Cornish-Fisher correction of the normal seed
    let z = normal_tail_seed(&tail)?;
    let nu = df.to_f64();
    let seed = z + (z * z * z + z) / (4.0 * nu);
    let t = invert_upper_tail(
        &tail,
        seed,
        |x| students_t_sf(x, &df),
        |x| students_t_pdf(x, &df),
    )?;
    let t = if upper { t } else { -t };
    Ok(t.with_context(ctx))
}

// F

/// `(F(x), 1 - F(x))` from `I_{d1x/(d1x+d2)}(d1/2, d2/2)`
fn f_tails(x: &Decimal, d1: &Decimal, d2: &Decimal) -> StatsResult<(Decimal, Decimal)> {
    check_dof(d1, "f")?;
    check_dof(d2, "f")?;
    let ctx = widest(&[x, d1, d2]);
    if !x.is_positive() {
        return Ok((ctx.zero(), ctx.one()));
    }
    let w = ctx.working();
    let (x, d1, d2) = (x.with_context(w), d1.with_context(w), d2.with_context(w));
    let scaled = &d1 * &x;
    let denominator = &scaled + &d2;
    let u = &scaled / &denominator;
    let v = &d2 / &denominator;
    let (cdf, sf) = beta_pair(&u, &v, &(&d1 / 2), &(&d2 / 2))?;
    Ok((cdf.with_context(ctx), sf.with_context(ctx)))
}

pub fn f_cdf(x: &Decimal, d1: &Decimal, d2: &Decimal) -> StatsResult<Decimal> {
    Ok(f_tails(x, d1, d2)?.0)
}

pub fn f_sf(x: &Decimal, d1: &Decimal, d2: &Decimal) -> StatsResult<Decimal> {
    Ok(f_tails(x, d1, d2)?.1)
}

pub fn f_pdf(x: &Decimal, d1: &Decimal, d2: &Decimal) -> StatsResult<Decimal> {
    check_dof(d1, "f_pdf")?;
    check_dof(d2, "f_pdf")?;
    let ctx = widest(&[x, d1, d2]);
    if x.is_negative() {
        return Ok(ctx.zero());
    }
    let w = ctx.working();
    let (x, d1, d2) = (x.with_context(w), d1.with_context(w), d2.with_context(w));
    if x.is_zero() {
        let two = w.int(2);
        return match d1.cmp(&two) {
            std::cmp::Ordering::Greater => Ok(ctx.zero()),
            std::cmp::Ordering::Equal => Ok(ctx.one()),
            std::cmp::Ordering::Less => Err(StatsError::domain("f_pdf", "density is unbounded at zero")),
        };
    }
    let (a, b) = (&d1 / 2, &d2 / 2);
    let log_density = &a * d1.ln()? + &b * d2.ln()? + (&a - 1) * x.ln()?
        - (&a + &b) * (&d1 * &x + &d2).ln()?
        - ln_beta(&a, &b)?;
    Ok(exp_or_zero(&log_density)?.with_context(ctx))
}

/// F quantile for 0 <= p < 1
pub fn f_inverse_cdf(p: &Decimal, d1: &Decimal, d2: &Decimal) -> StatsResult<Decimal> {
    check_probability(p, "f_inverse_cdf", true)?;
    let ctx = widest(&[p, d1, d2]);
    if p.is_zero() {
        return Ok(ctx.zero());
    }
    let w = ctx.working();
    let (d1, d2) = (d1.with_context(w), d2.with_context(w));
    let target = w.one() - p;
    let x = invert_upper_tail(&target, 1.0, |x| f_sf(x, &d1, &d2), |x| f_pdf(x, &d1, &d2))?;
    Ok(x.with_context(ctx))
}

// Chi-square

fn chi_square_tails(x: &Decimal, k: &Decimal) -> StatsResult<(Decimal, Decimal)> {
    check_dof(k, "chi_square")?;
    let ctx = widest(&[x, k]);
    if !x.is_positive() {
        return Ok((ctx.zero(), ctx.one()));
    }
    let w = ctx.working();
    gamma_pq(&(k.with_context(w) / 2), &(x.with_context(w) / 2))
        .map(|(p, q)| (p.with_context(ctx), q.with_context(ctx)))
}

pub fn chi_square_cdf(x: &Decimal, k: &Decimal) -> StatsResult<Decimal> {
    Ok(chi_square_tails(x, k)?.0)
}

pub fn chi_square_sf(x: &Decimal, k: &Decimal) -> StatsResult<Decimal> {
    Ok(chi_square_tails(x, k)?.1)
}

pub fn chi_square_pdf(x: &Decimal, k: &Decimal) -> StatsResult<Decimal> {
    check_dof(k, "chi_square_pdf")?;
    let ctx = widest(&[x, k]);
    if x.is_negative() {
        return Ok(ctx.zero());
    }
    let w = ctx.working();
    let (x, k) = (x.with_context(w), k.with_context(w));
    let half_k = &k / 2;
    if x.is_zero() {
        let one = w.one();
        return match half_k.cmp(&one) {
            std::cmp::Ordering::Greater => Ok(ctx.zero()),
            std::cmp::Ordering::Equal => Ok((one / 2).with_context(ctx)),
            std::cmp::Ordering::Less => Err(StatsError::domain("chi_square_pdf", "density is unbounded at zero")),
        };
    }
    let log_density =
        (&half_k - 1) * x.ln()? - &x / 2 - &half_k * Decimal::ln2(w) - ln_gamma(&half_k)?;
    Ok(exp_or_zero(&log_density)?.with_context(ctx))
}

/// Chi-square quantile for 0 <= p < 1
pub fn chi_square_inverse_cdf(p: &Decimal, k: &Decimal) -> StatsResult<Decimal> {
    check_probability(p, "chi_square_inverse_cdf", true)?;
    check_dof(k, "chi_square_inverse_cdf")?;
    let ctx = widest(&[p, k]);
    if p.is_zero() {
        return Ok(ctx.zero());
    }
    let w = ctx.working();
    let k = k.with_context(w);
    let target = w.one() - p;
    // Wilson-Hilferty
    let z = acklam(p.to_f64().clamp(1e-300, 1.0 - 1e-16));
    let kf = k.to_f64();
    let h = 2.0 / (9.0 * kf);
    let seed = (kf * (1.0 - h + z * h.sqrt()).powi(3)).max(1e-8);
    let x = invert_upper_tail(
        &target,
        seed,
        |x| chi_square_sf(x, &k),
        |x| chi_square_pdf(x, &k),
    )?;
    Ok(x.with_context(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::PrecisionContext;
    use approx::assert_relative_eq;
    use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

    fn ctx() -> PrecisionContext {
        PrecisionContext::default()
    }

    fn d(value: f64) -> Decimal {
        ctx().from_f64(value).unwrap()
    }

    fn assert_rel(actual: &Decimal, expected: &Decimal, digits: i64) {
        let tol = expected.abs() * ctx().pow10(-digits);
        assert!((actual - expected).abs() <= tol, "{} vs {}", actual, expected);
    }

    #[test]
    fn test_normal_against_statrs() {
        let reference = Normal::new(0.0, 1.0).unwrap();
        for z in [-3.5, -1.0, 0.0, 0.3, 1.96, 4.0] {
            assert_relative_eq!(normal_cdf(&d(z)).unwrap().to_f64(), reference.cdf(z), max_relative = 1e-12);
            assert_relative_eq!(normal_pdf(&d(z)).unwrap().to_f64(), reference.pdf(z), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_normal_far_tail() {
        // 1 - Φ(10) = erfc(10/√2)/2
        let sf = normal_sf(&ctx().int(10)).unwrap();
        let expected = ctx()
            .parse("7.6198530241605260659733432515993083635040332779693e-24")
            .unwrap();
        assert_rel(&sf, &expected, 45);
        let cdf = normal_cdf(&ctx().int(-10)).unwrap();
        assert_eq!(cdf, sf);
    }

    #[test]
    fn test_normal_quantile() {
        let p = ctx().parse("0.975").unwrap();
        let q = normal_inverse_cdf(&p).unwrap();
        assert_relative_eq!(q.to_f64(), 1.959963984540054, max_relative = 1e-14);
        assert_rel(&normal_cdf(&q).unwrap(), &p, 45);
        let tiny = normal_inverse_cdf(&ctx().parse("1e-400").unwrap()).unwrap();
        assert!(tiny < ctx().int(-42));
        assert!(normal_inverse_cdf(&ctx().zero()).is_err());
        assert_eq!(normal_inverse_cdf(&ctx().parse("0.5").unwrap()).unwrap(), ctx().zero());
    }

    #[test]
    fn test_students_t_against_statrs() {
        for (t, df) in [(2.0, 5.0), (-1.3, 12.0), (0.5, 1.0), (3.7, 30.5)] {
            let reference = StudentsT::new(0.0, 1.0, df).unwrap();
            let cdf = students_t_cdf(&d(t), &d(df)).unwrap();
            assert_relative_eq!(cdf.to_f64(), reference.cdf(t), max_relative = 1e-10);
            let pdf = students_t_pdf(&d(t), &d(df)).unwrap();
            assert_relative_eq!(pdf.to_f64(), reference.pdf(t), max_relative = 1e-10);
        }
        // Cauchy: P(T > 1) = 1/4
        let sf = students_t_sf(&ctx().one(), &ctx().one()).unwrap();
        assert_rel(&sf, &ctx().parse("0.25").unwrap(), 47);
        let centre = students_t_cdf(&ctx().zero(), &ctx().int(7)).unwrap();
        assert_eq!(centre, ctx().parse("0.5").unwrap());
    }

    #[test]
    fn test_students_t_quantile_roundtrip() {
        let df = ctx().int(8);
        let p = ctx().parse("0.995").unwrap();
        let t = students_t_inverse_cdf(&p, &df).unwrap();
        assert_relative_eq!(t.to_f64(), 3.355387331, max_relative = 1e-9);
        assert_rel(&students_t_cdf(&t, &df).unwrap(), &p, 45);
        let lower = students_t_inverse_cdf(&(ctx().one() - &p), &df).unwrap();
        assert_eq!(lower, -t);
    }

    #[test]
    fn test_f_against_statrs() {
        for (x, d1, d2) in [(1.5, 3.0, 10.0), (0.2, 2.0, 7.0), (12.0, 5.0, 20.0)] {
            let reference = FisherSnedecor::new(d1, d2).unwrap();
            let cdf = f_cdf(&d(x), &d(d1), &d(d2)).unwrap();
            assert_relative_eq!(cdf.to_f64(), reference.cdf(x), max_relative = 1e-10);
            let pdf = f_pdf(&d(x), &d(d1), &d(d2)).unwrap();
            assert_relative_eq!(pdf.to_f64(), reference.pdf(x), max_relative = 1e-10);
        }
        assert_eq!(f_sf(&ctx().zero(), &ctx().int(2), &ctx().int(3)).unwrap(), ctx().one());
        let q = f_inverse_cdf(&ctx().parse("0.95").unwrap(), &ctx().int(2), &ctx().int(6)).unwrap();
        assert_relative_eq!(q.to_f64(), 5.143252849784718, max_relative = 1e-12);
    }

    #[test]
    fn test_chi_square_against_statrs() {
        for (x, k) in [(0.5, 1.0), (3.84, 1.0), (10.0, 4.0), (80.0, 60.0)] {
            let reference = ChiSquared::new(k).unwrap();
            let cdf = chi_square_cdf(&d(x), &d(k)).unwrap();
            assert_relative_eq!(cdf.to_f64(), reference.cdf(x), max_relative = 1e-10);
            let pdf = chi_square_pdf(&d(x), &d(k)).unwrap();
            assert_relative_eq!(pdf.to_f64(), reference.pdf(x), max_relative = 1e-10);
        }
        // k = 2: sf(x) = e^{-x/2}
        let x = ctx().int(7);
        let sf = chi_square_sf(&x, &ctx().int(2)).unwrap();
        assert_rel(&sf, &(-(&x) / 2).exp().unwrap(), 47);
        let q = chi_square_inverse_cdf(&ctx().parse("0.95").unwrap(), &ctx().int(3)).unwrap();
        assert_relative_eq!(q.to_f64(), 7.814727903251178, max_relative = 1e-12);
    }
    fn lit(value: &str) -> Decimal {
        ctx().parse(value).unwrap()
    }

    #[test]
    fn test_students_t_reference_digits() {
        let df = ctx().int(5);
        let body = students_t_cdf(&ctx().int(2), &df).unwrap();
        assert_rel(&body, &lit("0.94903026058507082187731944707885628468930095941712"), 48);
        let tail = students_t_sf(&ctx().int(10), &df).unwrap();
        assert_rel(&tail, &lit("0.000085473787871481795353158381387380499136427975045653"), 48);
        let far = students_t_sf(&ctx().int(100), &df).unwrap();
        assert_rel(&far, &lit("9.4800071123118136942735414363862420276502313420093e-10"), 48);
        let q = students_t_inverse_cdf(&lit("0.975"), &df).unwrap();
        assert_rel(&q, &lit("2.570581835636315514696246217439633513341530557397"), 47);
    }

    #[test]
    fn test_f_reference_digits() {
        let (d1, d2) = (ctx().int(2), ctx().int(6));
        // 1 - (1 + x/3)^-3 = 19/27 at x = 1.5
        let body = f_cdf(&lit("1.5"), &d1, &d2).unwrap();
        assert_rel(&body, &(ctx().int(19) / 27), 48);
        let tail = f_sf(&ctx().int(100), &d1, &d2).unwrap();
        assert_rel(&tail, &lit("0.000024708824802535308453071993279199653710396100764418"), 48);
        let q = f_inverse_cdf(&lit("0.95"), &d1, &d2).unwrap();
        assert_rel(&q, &lit("5.1432528497847197145542684090384676144153233084673"), 47);
    }

    #[test]
    fn test_chi_square_reference_digits() {
        let k = ctx().int(3);
        let body = chi_square_cdf(&lit("2.5"), &k).unwrap();
        assert_rel(&body, &lit("0.5247089166569794098414469689513390582377196407719"), 48);
        let tail = chi_square_sf(&ctx().int(60), &k).unwrap();
        assert_rel(&tail, &lit("5.8782307279069123410086374177855396371070541277311e-13"), 48);
        let q = chi_square_inverse_cdf(&lit("0.95"), &k).unwrap();
        assert_rel(&q, &lit("7.8147279032511799552689948735204502691658177899033"), 47);
    }

    #[test]
    fn test_quantile_refinement_stops_after_newton_converges() {
        let w = ctx().working();
        let tail = w.parse("0.025").unwrap();
        let seed = normal_tail_seed(&tail).unwrap();
        let (z, iterations) = refine_upper_tail(&tail, seed, normal_sf, normal_pdf).unwrap();
        assert!(iterations < 10, "normal quantile took {} iterations", iterations);
        assert_rel(
            &z.with_context(ctx()),
            &lit("1.9599639845400542355245944305205515279555500778695"),
            47,
        );

        let df = w.int(5);
        let tail = w.parse("0.005").unwrap();
        let (_, iterations) =
            refine_upper_tail(&tail, 4.0, |x| students_t_sf(x, &df), |x| students_t_pdf(x, &df)).unwrap();
        assert!(iterations < 10, "t quantile took {} iterations", iterations);

        let k = w.int(3);
        let tail = w.parse("0.05").unwrap();
        let (_, iterations) =
            refine_upper_tail(&tail, 7.8, |x| chi_square_sf(x, &k), |x| chi_square_pdf(x, &k)).unwrap();
        assert!(iterations < 10, "chi-square quantile took {} iterations", iterations);

        let (d1, d2) = (w.int(2), w.int(6));
        let (_, iterations) =
            refine_upper_tail(&tail, 1.0, |x| f_sf(x, &d1, &d2), |x| f_pdf(x, &d1, &d2)).unwrap();
        assert!(iterations < 20, "F quantile took {} iterations", iterations);
    }
}
