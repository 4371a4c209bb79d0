//! Multiple-comparison p-value adjustment
//!
//! Raw p-values are ranked ascending (ties keep their input order). Each
//! adjusted value is clamped into `[raw, 1]` and the adjusted sequence is
//! made non-decreasing in that ranking.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::{StatsError, StatsResult};

/// P-value adjustment procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// `min(1, m p)`
    Bonferroni,
    /// Step-down, multiplier `m - i` for 0-based rank `i`
    #[default]
    Holm,
    /// Step-up false discovery rate, multiplier `m / (i + 1)`
    BenjaminiHochberg,
    /// `1 - (1 - p)^m`
    Sidak,
}

impl FromStr for CorrectionMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "holm" | "holm_bonferroni" => Ok(CorrectionMethod::Holm),
            "bh" | "fdr" | "fdr_bh" | "benjamini_hochberg" | "benjaminihochberg" => {
                Ok(CorrectionMethod::BenjaminiHochberg)
            }
            "sidak" | "šidák" => Ok(CorrectionMethod::Sidak),
            other => Err(StatsError::UnsupportedConfiguration(format!(
                "unknown correction method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::BenjaminiHochberg => "benjamini_hochberg",
            CorrectionMethod::Sidak => "sidak",
        })
    }
}

fn sidak(p: &Decimal, m: usize, w: PrecisionContext) -> StatsResult<Decimal> {
    if *p >= w.one() {
        return Ok(w.one());
    }
    // 1 - (1 - p)^m without cancellation for small p
    let log_keep = (-p).ln_1p()? * m as i64;
    Ok(-log_keep.exp_m1()?)
}

/// Adjust a slice of raw p-values; the output is in input order
pub fn adjust_p_values(p_values: &[Decimal], method: CorrectionMethod, ctx: PrecisionContext) -> StatsResult<Vec<Decimal>> {
    let w = ctx.working();
    let one = w.one();
    for (index, p) in p_values.iter().enumerate() {
        if p.is_negative() || *p > one {
            return Err(StatsError::InvalidArgument(format!(
                "p-value {} at index {} lies outside [0, 1]",
                p, index
            )));
        }
    }
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].cmp(&p_values[b]));
    let raw: Vec<Decimal> = order.iter().map(|&i| p_values[i].with_context(w)).collect();

    let mut adjusted: Vec<Decimal> = match method {
        CorrectionMethod::Bonferroni => raw.iter().map(|p| p * m as i64).collect(),
        CorrectionMethod::Holm => raw.iter().enumerate().map(|(i, p)| p * (m - i) as i64).collect(),
        CorrectionMethod::BenjaminiHochberg => {
            let mut scaled: Vec<Decimal> = raw
                .iter()
                .enumerate()
                .map(|(i, p)| p * m as i64 / (i + 1) as i64)
                .collect();
            // step-up: running minimum from the largest p-value down
            for i in (0..m.saturating_sub(1)).rev() {
                if scaled[i + 1] < scaled[i] {
                    scaled[i] = scaled[i + 1].clone();
                }
            }
            scaled
        }
        CorrectionMethod::Sidak => raw.iter().map(|p| sidak(p, m, w)).collect::<StatsResult<_>>()?,
    };

    let mut floor = w.zero();
    for (value, p) in adjusted.iter_mut().zip(&raw) {
        let clamped = value.clone().clamp(p.clone(), one.clone()).max(floor.clone());
        floor = clamped.clone();
        *value = clamped;
    }

    let mut out = vec![ctx.zero(); m];
    for (rank, &index) in order.iter().enumerate() {
        out[index] = adjusted[rank].with_context(ctx);
    }
    tracing::debug!(%method, count = m, "p-values adjusted");
    Ok(out)
}

/// Adjust a comparison-id to raw p-value mapping
pub fn adjust_p_value_map<K: Ord + Clone>(
    p_values: &BTreeMap<K, Decimal>,
    method: CorrectionMethod,
    ctx: PrecisionContext,
) -> StatsResult<BTreeMap<K, Decimal>> {
    let (keys, values): (Vec<K>, Vec<Decimal>) = p_values.iter().map(|(k, v)| (k.clone(), v.clone())).unzip();
    let adjusted = adjust_p_values(&values, method, ctx)?;
    Ok(keys.into_iter().zip(adjusted).collect())
}
