//! Engine facade
//!
//! An [`Engine`] owns one [`PrecisionContext`] and dispatches a closed set of
//! [`TestRequest`]s to the kernels. Requests and responses are serde types, so
//! the same dispatch serves Rust callers and the JSON boundary.
//!
//! ```json
//! {"test": "t_test", "group1": ["1.1", "2.3"], "group2": ["0.9", "1.7"],
//!  "options": {"kind": "student"}, "precision": {"digits": 60}}
//! ```

use serde::{Deserialize, Serialize};

use crate::aggregate::{describe, AggregateStatistics};
use crate::correction::{adjust_p_values, CorrectionMethod};
use crate::decimal::Decimal;
use crate::posthoc::{post_hoc, PostHocMethod, PostHocOptions, PostHocReport};
use crate::precision::PrecisionContext;
use crate::tests::categorical::{
    chi_square_goodness_of_fit, chi_square_independence, cochran_q, g_test, g_test_goodness_of_fit,
    mcnemar_test, ChiSquareOptions,
};
use crate::tests::correlation::{kendall, pearson, spearman, CorrelationOptions};
use crate::tests::exact::{binomial_test, fisher_exact, multinomial_test, ExactTestOptions};
use crate::tests::parametric::{one_sample_t_test, one_way_anova, paired_t_test, t_test, AnovaOptions, TTestOptions};
use crate::tests::{AnovaResult, CorrelationResult, FisherExactResult, TestResult};
use crate::{StatsError, StatsResult};

/// Every computation the engine can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestRequest {
    Describe {
        sample: Vec<Decimal>,
        #[serde(default = "default_ddof")]
        ddof: usize,
    },
    OneSampleTTest {
        sample: Vec<Decimal>,
        #[serde(default)]
        options: TTestOptions,
    },
    TTest {
        group1: Vec<Decimal>,
        group2: Vec<Decimal>,
        #[serde(default)]
        options: TTestOptions,
    },
    PairedTTest {
        x: Vec<Decimal>,
        y: Vec<Decimal>,
        #[serde(default)]
        options: TTestOptions,
    },
    OneWayAnova {
        groups: Vec<Vec<Decimal>>,
        #[serde(default)]
        options: AnovaOptions,
    },
    PostHoc {
        groups: Vec<Vec<Decimal>>,
        method: PostHocMethod,
        #[serde(default)]
        anova: AnovaOptions,
        #[serde(default)]
        options: PostHocOptions,
    },
    Pearson {
        x: Vec<Decimal>,
        y: Vec<Decimal>,
        #[serde(default)]
        options: CorrelationOptions,
    },
    Spearman {
        x: Vec<Decimal>,
        y: Vec<Decimal>,
        #[serde(default)]
        options: CorrelationOptions,
    },
    Kendall {
        x: Vec<Decimal>,
        y: Vec<Decimal>,
        #[serde(default)]
        options: CorrelationOptions,
    },
    ChiSquareIndependence {
        table: Vec<Vec<u64>>,
        #[serde(default)]
        options: ChiSquareOptions,
    },
    ChiSquareGoodnessOfFit {
        observed: Vec<u64>,
        #[serde(default)]
        proportions: Option<Vec<Decimal>>,
    },
    GTest {
        table: Vec<Vec<u64>>,
    },
    GTestGoodnessOfFit {
        observed: Vec<u64>,
        #[serde(default)]
        proportions: Option<Vec<Decimal>>,
    },
    FisherExact {
        table: [[u64; 2]; 2],
        #[serde(default)]
        options: ExactTestOptions,
    },
    Mcnemar {
        table: [[u64; 2]; 2],
    },
    CochranQ {
        data: Vec<Vec<u8>>,
    },
    BinomialTest {
        successes: u64,
        trials: u64,
        p: Decimal,
        #[serde(default)]
        options: ExactTestOptions,
    },
    MultinomialTest {
        observed: Vec<u64>,
        #[serde(default)]
        proportions: Option<Vec<Decimal>>,
    },
    AdjustPValues {
        p_values: Vec<Decimal>,
        #[serde(default)]
        method: CorrectionMethod,
    },
}

fn default_ddof() -> usize {
    1
}

impl TestRequest {
    /// Wire name of the request
    pub fn name(&self) -> &'static str {
        match self {
            TestRequest::Describe { .. } => "describe",
            TestRequest::OneSampleTTest { .. } => "one_sample_t_test",
            TestRequest::TTest { .. } => "t_test",
            TestRequest::PairedTTest { .. } => "paired_t_test",
            TestRequest::OneWayAnova { .. } => "one_way_anova",
            TestRequest::PostHoc { .. } => "post_hoc",
            TestRequest::Pearson { .. } => "pearson",
            TestRequest::Spearman { .. } => "spearman",
            TestRequest::Kendall { .. } => "kendall",
            TestRequest::ChiSquareIndependence { .. } => "chi_square_independence",
            TestRequest::ChiSquareGoodnessOfFit { .. } => "chi_square_goodness_of_fit",
            TestRequest::GTest { .. } => "g_test",
            TestRequest::GTestGoodnessOfFit { .. } => "g_test_goodness_of_fit",
            TestRequest::FisherExact { .. } => "fisher_exact",
            TestRequest::Mcnemar { .. } => "mcnemar",
            TestRequest::CochranQ { .. } => "cochran_q",
            TestRequest::BinomialTest { .. } => "binomial_test",
            TestRequest::MultinomialTest { .. } => "multinomial_test",
            TestRequest::AdjustPValues { .. } => "adjust_p_values",
        }
    }
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestResponse {
    Aggregate(AggregateStatistics),
    Test(TestResult),
    Anova(AnovaResult),
    PostHoc {
        anova: AnovaResult,
        post_hoc: PostHocReport,
    },
    Correlation(CorrelationResult),
    FisherExact(FisherExactResult),
    Adjusted {
        method: CorrectionMethod,
        adjusted_p_values: Vec<Decimal>,
    },
}

/// Request plus an optional per-call precision override
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    precision: Option<PrecisionContext>,
    #[serde(flatten)]
    request: TestRequest,
}

/// Stateless dispatcher holding the configured precision
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Engine {
    ctx: PrecisionContext,
}

impl Engine {
    pub fn new(ctx: PrecisionContext) -> Self {
        Self { ctx }
    }

    /// Engine configured from `PRECISTAT_DIGITS` / `PRECISTAT_ROUNDING`
    pub fn from_env() -> StatsResult<Self> {
        Ok(Self::new(PrecisionContext::from_env()?))
    }

    pub fn context(&self) -> PrecisionContext {
        self.ctx
    }

    /// Run a request at the engine's precision
    pub fn run(&self, request: &TestRequest) -> StatsResult<TestResponse> {
        self.run_with(request, self.ctx)
    }

    /// Run a request at an explicit precision
    pub fn run_with(&self, request: &TestRequest, ctx: PrecisionContext) -> StatsResult<TestResponse> {
        let _span = tracing::debug_span!("run", test = request.name(), digits = ctx.digits()).entered();
        let response = match request {
            TestRequest::Describe { sample, ddof } => TestResponse::Aggregate(describe(sample, *ddof, ctx)?),
            TestRequest::OneSampleTTest { sample, options } => {
                TestResponse::Test(one_sample_t_test(sample, options, ctx)?)
            }
            TestRequest::TTest { group1, group2, options } => TestResponse::Test(t_test(group1, group2, options, ctx)?),
            TestRequest::PairedTTest { x, y, options } => TestResponse::Test(paired_t_test(x, y, options, ctx)?),
            TestRequest::OneWayAnova { groups, options } => TestResponse::Anova(one_way_anova(groups, options, ctx)?),
            TestRequest::PostHoc {
                groups,
                method,
                anova,
                options,
            } => {
                let anova = one_way_anova(groups, anova, ctx)?;
                let report = post_hoc(groups, &anova, *method, options, ctx)?;
                TestResponse::PostHoc {
                    anova,
                    post_hoc: report,
                }
            }
            TestRequest::Pearson { x, y, options } => TestResponse::Correlation(pearson(x, y, options, ctx)?),
            TestRequest::Spearman { x, y, options } => TestResponse::Correlation(spearman(x, y, options, ctx)?),
            TestRequest::Kendall { x, y, options } => TestResponse::Correlation(kendall(x, y, options, ctx)?),
            TestRequest::ChiSquareIndependence { table, options } => {
                TestResponse::Test(chi_square_independence(table, options, ctx)?)
            }
            TestRequest::ChiSquareGoodnessOfFit { observed, proportions } => {
                TestResponse::Test(chi_square_goodness_of_fit(observed, proportions.as_deref(), ctx)?)
            }
            TestRequest::GTest { table } => TestResponse::Test(g_test(table, ctx)?),
            TestRequest::GTestGoodnessOfFit { observed, proportions } => {
                TestResponse::Test(g_test_goodness_of_fit(observed, proportions.as_deref(), ctx)?)
            }
            TestRequest::FisherExact { table, options } => TestResponse::FisherExact(fisher_exact(table, options, ctx)?),
            TestRequest::Mcnemar { table } => TestResponse::Test(mcnemar_test(table, ctx)?),
            TestRequest::CochranQ { data } => TestResponse::Test(cochran_q(data, ctx)?),
            TestRequest::BinomialTest {
                successes,
                trials,
                p,
                options,
            } => TestResponse::Test(binomial_test(*successes, *trials, p, options, ctx)?),
            TestRequest::MultinomialTest { observed, proportions } => {
                TestResponse::Test(multinomial_test(observed, proportions.as_deref(), ctx)?)
            }
            TestRequest::AdjustPValues { p_values, method } => TestResponse::Adjusted {
                method: *method,
                adjusted_p_values: adjust_p_values(p_values, *method, ctx)?,
            },
        };
        Ok(response)
    }

    /// Parse a JSON request, run it and serialize the response.
    ///
    /// A `"precision"` object in the request overrides the engine's context
    /// for this call only. Unknown test names are reported as
    /// [`StatsError::UnsupportedConfiguration`].
    pub fn run_json(&self, json: &str) -> StatsResult<String> {
        let envelope: Envelope = serde_json::from_str(json).map_err(|err| {
            let message = err.to_string();
            if message.contains("unknown variant") {
                StatsError::UnsupportedConfiguration(message)
            } else {
                StatsError::Serialization(message)
            }
        })?;
        let ctx = envelope.precision.unwrap_or(self.ctx);
        let response = self.run_with(&envelope.request, ctx)?;
        Ok(serde_json::to_string(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn engine() -> Engine {
        Engine::default()
    }

    #[test]
    fn test_run_typed_request() {
        let ctx = PrecisionContext::default();
        let request = TestRequest::TTest {
            group1: ctx.sample(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            group2: ctx.sample(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            options: TTestOptions::default(),
        };
        match engine().run(&request).unwrap() {
            TestResponse::Test(result) => {
                assert_eq!(result.statistic, ctx.zero());
                assert_eq!(result.p_value, ctx.one());
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_run_json_anova() {
        let json = r#"{"test": "one_way_anova", "groups": [[1, 2, 3], [4, 5, 6], [7, 8, 9]]}"#;
        let out: Value = serde_json::from_str(&engine().run_json(json).unwrap()).unwrap();
        assert_eq!(out["method"], "One-way ANOVA");
        assert_eq!(out["df_between"], 2);
        let statistic: Decimal = out["statistic"].as_str().unwrap().parse().unwrap();
        assert_eq!(statistic, PrecisionContext::default().int(27));
    }

    #[test]
    fn test_run_json_precision_override() {
        let json = r#"{"test": "describe", "sample": ["1", "2"], "precision": {"digits": 20}}"#;
        let out: Value = serde_json::from_str(&engine().run_json(json).unwrap()).unwrap();
        // 20 significant digits of 1.5
        assert_eq!(out["mean"], "1.5000000000000000000");
    }

    #[test]
    fn test_run_json_errors() {
        let unknown = engine().run_json(r#"{"test": "dunnett", "groups": []}"#);
        assert!(matches!(unknown, Err(StatsError::UnsupportedConfiguration(_))));
        let malformed = engine().run_json("{not json");
        assert!(matches!(malformed, Err(StatsError::Serialization(_))));
        let too_precise = engine().run_json(r#"{"test": "describe", "sample": [1, 2], "precision": {"digits": 500}}"#);
        assert!(too_precise.is_err());
    }

    #[test]
    fn test_adjust_request() {
        let json = r#"{"test": "adjust_p_values", "p_values": ["0.01", "0.02", "0.03", "0.5"], "method": "benjamini_hochberg"}"#;
        let out: Value = serde_json::from_str(&engine().run_json(json).unwrap()).unwrap();
        assert_eq!(out["adjusted_p_values"].as_array().unwrap().len(), 4);
        assert_eq!(out["method"], "benjamini_hochberg");
    }
}
