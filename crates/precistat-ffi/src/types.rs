//! C-compatible types for FFI boundary

use libc::c_char;
use precistat_core::tests::parametric::{AnovaKind, TTestKind};
use precistat_core::Alternative;

/// Error codes for FFI boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput = 1,
    InsufficientData = 2,
    InsufficientGroups = 3,
    ShapeMismatch = 4,
    NonFiniteInput = 5,
    UnsupportedConfiguration = 6,
    DomainError = 7,
    ConvergenceFailure = 8,
    AllocationFailure = 9,
    SerializationError = 10,
    InternalError = 99,
}

/// Error information for FFI
#[repr(C)]
pub struct PrecistatError {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl PrecistatError {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    pub fn set(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(255);
        for (i, &b) in bytes[..len].iter().enumerate() {
            self.message[i] = b as c_char;
        }
        self.message[len] = 0;
    }
}

/// Array of f64 values with validity mask for NULL handling
#[repr(C)]
pub struct DataArray {
    /// Pointer to data values
    pub data: *const f64,
    /// Validity bitmask: bit i is 1 if data[i] is valid, 0 if NULL
    /// Can be NULL if all values are valid
    pub validity: *const u8,
    /// Number of elements
    pub len: usize,
}

impl DataArray {
    /// Check if index i is valid (not NULL)
    ///
    /// # Safety
    /// Caller must ensure index is within bounds
    pub unsafe fn is_valid(&self, i: usize) -> bool {
        if self.validity.is_null() {
            return true;
        }
        let byte_idx = i / 8;
        let bit_idx = i % 8;
        ((*self.validity.add(byte_idx)) >> bit_idx) & 1 == 1
    }

    /// Collect the non-NULL values; NULL entries are dropped
    ///
    /// # Safety
    /// Caller must ensure pointers are valid and len is correct
    pub unsafe fn valid_values(&self) -> Vec<f64> {
        if self.data.is_null() {
            return Vec::new();
        }
        (0..self.len)
            .filter(|&i| self.is_valid(i))
            .map(|i| *self.data.add(i))
            .collect()
    }
}

/// Alternative hypothesis
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternativeFFI {
    TwoSided = 0,
    Less = 1,
    Greater = 2,
}

impl From<AlternativeFFI> for Alternative {
    fn from(alt: AlternativeFFI) -> Self {
        match alt {
            AlternativeFFI::TwoSided => Alternative::TwoSided,
            AlternativeFFI::Less => Alternative::Less,
            AlternativeFFI::Greater => Alternative::Greater,
        }
    }
}

/// Two-sample t-test flavour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TTestKindFFI {
    Welch = 0,
    Student = 1,
    Paired = 2,
}

impl From<TTestKindFFI> for TTestKind {
    fn from(kind: TTestKindFFI) -> Self {
        match kind {
            TTestKindFFI::Welch => TTestKind::Welch,
            TTestKindFFI::Student => TTestKind::Student,
            TTestKindFFI::Paired => TTestKind::Paired,
        }
    }
}

/// t-test options
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TTestOptionsFFI {
    pub alternative: AlternativeFFI,
    pub kind: TTestKindFFI,
    /// Hypothesized mean difference
    pub mu: f64,
    /// Confidence level for the interval (0 selects 0.95)
    pub confidence_level: f64,
    /// Significant digits (0 selects the library default)
    pub digits: u32,
}

impl Default for TTestOptionsFFI {
    fn default() -> Self {
        Self {
            alternative: AlternativeFFI::TwoSided,
            kind: TTestKindFFI::Welch,
            mu: 0.0,
            confidence_level: 0.95,
            digits: 0,
        }
    }
}

/// One-way ANOVA flavour
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnovaKindFFI {
    Fisher = 0,
    Welch = 1,
}

impl From<AnovaKindFFI> for AnovaKind {
    fn from(kind: AnovaKindFFI) -> Self {
        match kind {
            AnovaKindFFI::Fisher => AnovaKind::Fisher,
            AnovaKindFFI::Welch => AnovaKind::Welch,
        }
    }
}

/// Hypothesis test result, rounded to double precision
#[repr(C)]
pub struct TestResultFFI {
    pub statistic: f64,
    pub p_value: f64,
    /// NaN when the test has no degrees of freedom
    pub df: f64,
    /// NaN when no effect size applies
    pub effect_size: f64,
    /// NaN when the side is open or no interval was computed
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub n: usize,
    /// Set when the safety policy replaced a value
    pub extreme_flag: bool,
}

impl Default for TestResultFFI {
    fn default() -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
            df: f64::NAN,
            effect_size: f64::NAN,
            ci_lower: f64::NAN,
            ci_upper: f64::NAN,
            n: 0,
            extreme_flag: false,
        }
    }
}

/// One-way ANOVA result
#[repr(C)]
pub struct AnovaResultFFI {
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub ss_between: f64,
    pub ss_within: f64,
    pub ss_total: f64,
    pub eta_squared: f64,
    pub n: usize,
    pub extreme_flag: bool,
}

impl Default for AnovaResultFFI {
    fn default() -> Self {
        Self {
            f_statistic: f64::NAN,
            p_value: f64::NAN,
            df_between: f64::NAN,
            df_within: f64::NAN,
            ss_between: f64::NAN,
            ss_within: f64::NAN,
            ss_total: f64::NAN,
            eta_squared: f64::NAN,
            n: 0,
            extreme_flag: false,
        }
    }
}

/// P-value correction procedure
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethodFFI {
    Bonferroni = 0,
    Holm = 1,
    BenjaminiHochberg = 2,
    Sidak = 3,
}
