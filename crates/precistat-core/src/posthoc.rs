//! Post-hoc pairwise comparisons after a one-way ANOVA
//!
//! - Tukey HSD (q statistic only; significance is left to the caller)
//! - Bonferroni-corrected pooled t-tests
//! - Scheffé's method
//! - Games-Howell (Welch t-tests with a p-value correction)
//!
//! Comparisons run only when the ANOVA p-value is below `alpha`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::{describe, AggregateStatistics, CompensatedSum};
use crate::correction::{adjust_p_values, CorrectionMethod};
use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::safety::{self, classify, Verdict};
use crate::special::{f_inverse_cdf, f_sf};
use crate::tests::{t_p_value, AnovaResult};
use crate::types::{check_level, default_alpha, Alternative};
use crate::{StatsError, StatsResult};

/// Pairwise comparison procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostHocMethod {
    TukeyHsd,
    Bonferroni,
    Scheffe,
    GamesHowell,
}

impl FromStr for PostHocMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tukey" | "tukey_hsd" | "tukeyhsd" => Ok(PostHocMethod::TukeyHsd),
            "bonferroni" => Ok(PostHocMethod::Bonferroni),
            "scheffe" | "scheffé" => Ok(PostHocMethod::Scheffe),
            "games_howell" | "gameshowell" => Ok(PostHocMethod::GamesHowell),
            other => Err(StatsError::UnsupportedConfiguration(format!(
                "unknown post-hoc method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PostHocMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostHocMethod::TukeyHsd => "tukey_hsd",
            PostHocMethod::Bonferroni => "bonferroni",
            PostHocMethod::Scheffe => "scheffe",
            PostHocMethod::GamesHowell => "games_howell",
        })
    }
}

/// Options for post-hoc comparisons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostHocOptions {
    /// Significance level (default: 0.05)
    pub alpha: Decimal,
    /// Correction applied to Games-Howell p-values (default: Holm)
    pub correction: CorrectionMethod,
}

impl Default for PostHocOptions {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            correction: CorrectionMethod::Holm,
        }
    }
}

/// One pair of groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub group_a: usize,
    pub group_b: usize,
    /// `mean_a - mean_b`
    pub mean_difference: Decimal,
    pub standard_error: Decimal,
    /// q for Tukey, t otherwise
    pub test_statistic: Decimal,
    pub degrees_of_freedom: Option<Decimal>,
    pub raw_p_value: Option<Decimal>,
    pub adjusted_p_value: Option<Decimal>,
    pub critical_value: Option<Decimal>,
    /// `None` when significance is deferred to the caller
    pub significant: Option<bool>,
}

/// All pairwise comparisons of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocReport {
    pub method: PostHocMethod,
    pub alpha: Decimal,
    /// False when the ANOVA was not significant
    pub executed: bool,
    pub note: Option<String>,
    pub comparisons: Vec<PairwiseComparison>,
}

/// Statistic of one pair after the safety policy
enum PairStatistic {
    Ratio(Decimal),
    /// Standard error vanished; statistic and p-value are fixed
    Fixed { statistic: Decimal, p_value: Decimal },
}

fn pair_statistic(diff: &Decimal, se: &Decimal, ctx: PrecisionContext) -> PairStatistic {
    match classify(diff, se, ctx) {
        Verdict::Regular => PairStatistic::Ratio(diff / se),
        Verdict::Degenerate => PairStatistic::Fixed {
            statistic: ctx.zero(),
            p_value: ctx.one(),
        },
        Verdict::Extreme { positive } => PairStatistic::Fixed {
            statistic: safety::sentinel(positive, ctx),
            p_value: safety::p_value_floor(ctx),
        },
    }
}

/// Group aggregates and pooled within-group mean square, at working
/// precision
struct Pooled {
    groups: Vec<AggregateStatistics>,
    ms_within: Decimal,
    df_within: Decimal,
}

fn pool(groups: &[Vec<Decimal>], w: PrecisionContext) -> StatsResult<Pooled> {
    let groups: Vec<AggregateStatistics> = groups.iter().map(|g| describe(g, 1, w)).collect::<StatsResult<_>>()?;
    let mut ss = CompensatedSum::new(w);
    for g in &groups {
        ss.add(&g.sum_of_squares(1));
    }
    let n: usize = groups.iter().map(|g| g.n).sum();
    let df_within = w.uint((n - groups.len()) as u64);
    Ok(Pooled {
        ms_within: ss.working_total() / &df_within,
        df_within,
        groups,
    })
}

/// Run a post-hoc procedure over the groups an ANOVA was computed on
pub fn post_hoc(
    groups: &[Vec<Decimal>],
    anova: &AnovaResult,
    method: PostHocMethod,
    options: &PostHocOptions,
    ctx: PrecisionContext,
) -> StatsResult<PostHocReport> {
    check_level(&options.alpha, "alpha")?;
    if groups.len() != anova.groups.len() {
        return Err(StatsError::ShapeMismatch(format!(
            "ANOVA was computed on {} groups, got {}",
            anova.groups.len(),
            groups.len()
        )));
    }
    let alpha = options.alpha.with_context(ctx);

    if anova.test.p_value >= alpha {
        tracing::debug!(%method, p_value = %anova.test.p_value, "ANOVA not significant, skipping comparisons");
        return Ok(PostHocReport {
            method,
            alpha: alpha.clone(),
            executed: false,
            note: Some(format!(
                "ANOVA p-value {} is not below alpha {}; pairwise comparisons were not performed.",
                anova.test.p_value, alpha
            )),
            comparisons: Vec::new(),
        });
    }

    let w = ctx.working();
    let pooled = pool(groups, w)?;
    let comparisons = match method {
        PostHocMethod::TukeyHsd => tukey_hsd(&pooled, ctx)?,
        PostHocMethod::Bonferroni => bonferroni(&pooled, &alpha, ctx)?,
        PostHocMethod::Scheffe => scheffe(&pooled, &alpha, ctx)?,
        PostHocMethod::GamesHowell => games_howell(&pooled, &alpha, options.correction, ctx)?,
    };
    let note = (method == PostHocMethod::TukeyHsd).then(|| {
        "Tukey HSD reports q statistics only; significance requires the studentized range distribution and is left undecided.".to_string()
    });
    tracing::debug!(%method, comparisons = comparisons.len(), "post-hoc comparisons complete");
    Ok(PostHocReport {
        method,
        alpha,
        executed: true,
        note,
        comparisons,
    })
}

fn pairs(k: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..k).flat_map(move |i| (i + 1..k).map(move |j| (i, j)))
}

fn comparison(
    i: usize,
    j: usize,
    diff: &Decimal,
    se: &Decimal,
    statistic: &Decimal,
    df: &Decimal,
    ctx: PrecisionContext,
) -> PairwiseComparison {
    PairwiseComparison {
        group_a: i,
        group_b: j,
        mean_difference: diff.with_context(ctx),
        standard_error: se.with_context(ctx),
        test_statistic: statistic.with_context(ctx),
        degrees_of_freedom: Some(df.with_context(ctx)),
        raw_p_value: None,
        adjusted_p_value: None,
        critical_value: None,
        significant: None,
    }
}

/// Pooled-variance standard error `sqrt(MSW (1/n_i + 1/n_j) * scale)`
fn pooled_se(pooled: &Pooled, i: usize, j: usize, scale: &Decimal) -> StatsResult<Decimal> {
    let w = pooled.ms_within.context();
    let inverse = w.one() / pooled.groups[i].n as i64 + w.one() / pooled.groups[j].n as i64;
    (&pooled.ms_within * inverse * scale).sqrt()
}

fn tukey_hsd(pooled: &Pooled, ctx: PrecisionContext) -> StatsResult<Vec<PairwiseComparison>> {
    let w = ctx.working();
    let half = w.one() / 2;
    pairs(pooled.groups.len())
        .map(|(i, j)| {
            let diff = &pooled.groups[i].mean - &pooled.groups[j].mean;
            let se = pooled_se(pooled, i, j, &half)?;
            let q = match pair_statistic(&diff, &se, ctx) {
                PairStatistic::Ratio(q) => q,
                PairStatistic::Fixed { statistic, .. } => statistic,
            };
            Ok(comparison(i, j, &diff, &se, &q, &pooled.df_within, ctx))
        })
        .collect()
}

/// Pooled t-test of one pair at working precision
struct PooledRow {
    row: PairwiseComparison,
    t: Decimal,
    p: Decimal,
    /// The safety policy fixed statistic and p-value
    fixed: bool,
}

/// Pooled t statistic and two-sided p-value for every pair
fn pooled_t(pooled: &Pooled, ctx: PrecisionContext) -> StatsResult<Vec<PooledRow>> {
    let w = ctx.working();
    pairs(pooled.groups.len())
        .map(|(i, j)| {
            let diff = &pooled.groups[i].mean - &pooled.groups[j].mean;
            let se = pooled_se(pooled, i, j, &w.one())?;
            let (t, p, fixed) = match pair_statistic(&diff, &se, ctx) {
                PairStatistic::Ratio(t) => {
                    let p = t_p_value(&t, &pooled.df_within, Alternative::TwoSided)?;
                    (t, p, false)
                }
                PairStatistic::Fixed { statistic, p_value } => (statistic, p_value, true),
            };
            Ok(PooledRow {
                row: comparison(i, j, &diff, &se, &t, &pooled.df_within, ctx),
                t,
                p,
                fixed,
            })
        })
        .collect()
}

fn bonferroni(pooled: &Pooled, alpha: &Decimal, ctx: PrecisionContext) -> StatsResult<Vec<PairwiseComparison>> {
    let rows = pooled_t(pooled, ctx)?;
    let m = rows.len() as i64;
    Ok(rows
        .into_iter()
        .map(|PooledRow { mut row, p, .. }| {
            let adjusted = safety::clamp_probability(&(&p * m), ctx);
            row.significant = Some(adjusted < *alpha);
            row.raw_p_value = Some(safety::clamp_probability(&p, ctx));
            row.adjusted_p_value = Some(adjusted);
            row
        })
        .collect())
}

fn scheffe(pooled: &Pooled, alpha: &Decimal, ctx: PrecisionContext) -> StatsResult<Vec<PairwiseComparison>> {
    let w = ctx.working();
    let d1 = w.uint(pooled.groups.len() as u64 - 1);
    let critical = f_inverse_cdf(&(w.one() - alpha), &d1, &pooled.df_within)? * &d1;
    let mut out = Vec::new();
    for PooledRow { mut row, t, p, fixed } in pooled_t(pooled, ctx)? {
        let t2 = &t * &t;
        let p = if fixed {
            p
        } else if t2.is_zero() {
            w.one()
        } else {
            f_sf(&(&t2 / &d1), &d1, &pooled.df_within)?
        };
        let p = safety::clamp_probability(&p, ctx);
        row.significant = Some(t2 > critical);
        row.critical_value = Some(critical.with_context(ctx));
        row.raw_p_value = Some(p.clone());
        row.adjusted_p_value = Some(p);
        out.push(row);
    }
    Ok(out)
}

fn games_howell(
    pooled: &Pooled,
    alpha: &Decimal,
    correction: CorrectionMethod,
    ctx: PrecisionContext,
) -> StatsResult<Vec<PairwiseComparison>> {
    let mut rows = Vec::new();
    let mut raw = Vec::new();
    for (i, j) in pairs(pooled.groups.len()) {
        let (a, b) = (&pooled.groups[i], &pooled.groups[j]);
        let diff = &a.mean - &b.mean;
        let ua = &a.variance / a.n as i64;
        let ub = &b.variance / b.n as i64;
        let total = &ua + &ub;
        let se = total.sqrt()?;
        let denominator = &ua * &ua / (a.n as i64 - 1) + &ub * &ub / (b.n as i64 - 1);
        let df = (&total * &total)
            .checked_div(&denominator)
            .unwrap_or_else(|| pooled.df_within.clone());
        let (t, p) = match pair_statistic(&diff, &se, ctx) {
            PairStatistic::Ratio(t) => {
                let p = t_p_value(&t, &df, Alternative::TwoSided)?;
                (t, p)
            }
            PairStatistic::Fixed { statistic, p_value } => (statistic, p_value),
        };
        let p = safety::clamp_probability(&p, ctx);
        let mut row = comparison(i, j, &diff, &se, &t, &df, ctx);
        row.raw_p_value = Some(p.clone());
        raw.push(p);
        rows.push(row);
    }
    let adjusted = adjust_p_values(&raw, correction, ctx)?;
    for (row, p) in rows.iter_mut().zip(adjusted) {
        row.significant = Some(p < *alpha);
        row.adjusted_p_value = Some(p);
    }
    Ok(rows)
}
