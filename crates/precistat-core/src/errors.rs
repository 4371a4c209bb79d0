use thiserror::Error;

/// Errors that can occur during statistical computations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    // Input validation errors
    #[error("Empty input: {field} cannot be empty")]
    EmptyInput { field: &'static str },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Insufficient groups: {test} requires at least {required} groups, got {actual}")]
    InsufficientGroups {
        test: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Non-finite value {value} at position {index}")]
    NonFiniteInput { index: usize, value: f64 },

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    // Numerical errors
    #[error("{function} is undefined for argument {argument}")]
    DomainError {
        function: &'static str,
        argument: String,
    },

    #[error("{algorithm} failed to converge after {iterations} iterations")]
    ConvergenceFailure {
        algorithm: &'static str,
        iterations: usize,
    },

    // Internal errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StatsError {
    pub(crate) fn domain(function: &'static str, argument: impl ToString) -> Self {
        StatsError::DomainError {
            function,
            argument: argument.to_string(),
        }
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err.to_string())
    }
}

/// Result type for statistical operations
pub type StatsResult<T> = Result<T, StatsError>;
