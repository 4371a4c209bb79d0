//! precistat-core: arbitrary-precision statistical tests
//!
//! Hypothesis tests, correlation, ANOVA and post-hoc comparisons evaluated
//! in decimal arithmetic at a configurable number of significant digits
//! (50 by default), designed for use directly or via the FFI crate.
//!
//! Every kernel takes a [`PrecisionContext`] by value, computes at that
//! precision plus guard digits and rounds once on the way out.

pub mod aggregate;
pub mod combinatorics;
pub mod correction;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod posthoc;
pub mod precision;
pub mod safety;
pub mod special;
pub mod tests;
pub mod types;

pub use decimal::Decimal;
pub use engine::{Engine, TestRequest, TestResponse};
pub use errors::{StatsError, StatsResult};
pub use precision::{PrecisionContext, RoundingMode};
pub use types::*;
