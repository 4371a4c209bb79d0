//! Stable aggregation primitives
//!
//! Means use Neumaier's variant of Kahan summation, variances use Welford's
//! single-pass update. Both run at working precision and round once when the
//! result is handed back.

use serde::Serialize;

use crate::decimal::Decimal;
use crate::precision::PrecisionContext;
use crate::{StatsError, StatsResult};

/// Running sum with a compensation term for lost low-order digits
#[derive(Debug, Clone)]
pub struct CompensatedSum {
    sum: Decimal,
    compensation: Decimal,
    count: usize,
    ctx: PrecisionContext,
}

impl CompensatedSum {
    pub fn new(ctx: PrecisionContext) -> Self {
        let working = ctx.working();
        Self {
            sum: working.zero(),
            compensation: working.zero(),
            count: 0,
            ctx,
        }
    }

    pub fn add(&mut self, value: &Decimal) {
        let value = value.with_context(self.ctx.working());
        let t = &self.sum + &value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (&self.sum - &t) + &value;
        } else {
            self.compensation += (&value - &t) + &self.sum;
        }
        self.sum = t;
        self.count += 1;
    }

    /// Number of values added so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// Compensated total at working precision
    pub(crate) fn working_total(&self) -> Decimal {
        &self.sum + &self.compensation
    }

    /// Compensated total rounded to the caller's context
    pub fn total(&self) -> Decimal {
        self.working_total().with_context(self.ctx)
    }
}

impl<'a> Extend<&'a Decimal> for CompensatedSum {
    fn extend<I: IntoIterator<Item = &'a Decimal>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

/// Compensated sum of a sample
pub fn sum(sample: &[Decimal], ctx: PrecisionContext) -> Decimal {
    let mut acc = CompensatedSum::new(ctx);
    acc.extend(sample);
    acc.total()
}

/// Arithmetic mean
pub fn mean(sample: &[Decimal], ctx: PrecisionContext) -> StatsResult<Decimal> {
    if sample.is_empty() {
        return Err(StatsError::EmptyInput { field: "sample" });
    }
    let mut acc = CompensatedSum::new(ctx);
    acc.extend(sample);
    Ok((acc.working_total() / sample.len() as i64).with_context(ctx))
}

/// Welford accumulator: running mean and sum of squared deviations
#[derive(Debug, Clone)]
struct Welford {
    n: usize,
    mean: Decimal,
    m2: Decimal,
}

impl Welford {
    fn run(sample: &[Decimal], ctx: PrecisionContext) -> Self {
        let working = ctx.working();
        let mut state = Welford {
            n: 0,
            mean: working.zero(),
            m2: working.zero(),
        };
        for value in sample {
            let x = value.with_context(working);
            state.n += 1;
            let delta = &x - &state.mean;
            state.mean += &delta / state.n as i64;
            state.m2 += delta * (&x - &state.mean);
        }
        state
    }
}

fn check_ddof(n: usize, ddof: usize) -> StatsResult<()> {
    if n == 0 {
        return Err(StatsError::EmptyInput { field: "sample" });
    }
    if n <= ddof {
        return Err(StatsError::InsufficientData(format!(
            "variance with ddof={} requires more than {} observations, got {}",
            ddof, ddof, n
        )));
    }
    Ok(())
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(sample: &[Decimal], ddof: usize, ctx: PrecisionContext) -> StatsResult<Decimal> {
    check_ddof(sample.len(), ddof)?;
    let state = Welford::run(sample, ctx);
    Ok((state.m2 / (state.n - ddof) as i64).with_context(ctx))
}

/// Standard deviation, `sqrt(variance)`
pub fn std(sample: &[Decimal], ddof: usize, ctx: PrecisionContext) -> StatsResult<Decimal> {
    check_ddof(sample.len(), ddof)?;
    let state = Welford::run(sample, ctx);
    let var = state.m2 / (state.n - ddof) as i64;
    Ok(var.sqrt()?.with_context(ctx))
}

/// Summary of one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub n: usize,
    pub mean: Decimal,
    pub variance: Decimal,
    pub std: Decimal,
}

impl AggregateStatistics {
    /// Sum of squared deviations from the mean, `variance * (n - ddof)`
    pub(crate) fn sum_of_squares(&self, ddof: usize) -> Decimal {
        &self.variance * (self.n - ddof) as i64
    }
}

/// Mean (compensated sum), variance and standard deviation (Welford)
pub fn describe(sample: &[Decimal], ddof: usize, ctx: PrecisionContext) -> StatsResult<AggregateStatistics> {
    check_ddof(sample.len(), ddof)?;
    let mean = mean(sample, ctx)?;
    let state = Welford::run(sample, ctx);
    let var = state.m2 / (state.n - ddof) as i64;
    let std = var.sqrt()?;
    Ok(AggregateStatistics {
        n: state.n,
        mean,
        variance: var.with_context(ctx),
        std: std.with_context(ctx),
    })
}
