//! C FFI boundary for precistat
//!
//! Typed entry points take double-precision arrays and return results rounded
//! back to doubles. [`precistat_run_json`] exposes the full engine with
//! decimal strings in and out, so no precision is lost at the boundary.

mod types;

pub use types::*;

use std::ffi::{CStr, CString};
use std::slice;
use std::sync::OnceLock;

use libc::c_char;
use precistat_core::correction::{adjust_p_values, CorrectionMethod};
use precistat_core::tests::parametric::{one_sample_t_test, one_way_anova, t_test, AnovaOptions, TTestOptions};
use precistat_core::tests::TestResult;
use precistat_core::{Decimal, Engine, PrecisionContext, StatsError, StatsResult};

/// Convert StatsError to ErrorCode
fn error_to_code(err: &StatsError) -> ErrorCode {
    match err {
        StatsError::EmptyInput { .. } => ErrorCode::InvalidInput,
        StatsError::InvalidArgument(_) => ErrorCode::InvalidInput,
        StatsError::InsufficientData(_) => ErrorCode::InsufficientData,
        StatsError::InsufficientGroups { .. } => ErrorCode::InsufficientGroups,
        StatsError::ShapeMismatch(_) => ErrorCode::ShapeMismatch,
        StatsError::NonFiniteInput { .. } => ErrorCode::NonFiniteInput,
        StatsError::UnsupportedConfiguration(_) => ErrorCode::UnsupportedConfiguration,
        StatsError::DomainError { .. } => ErrorCode::DomainError,
        StatsError::ConvergenceFailure { .. } => ErrorCode::ConvergenceFailure,
        StatsError::Serialization(_) => ErrorCode::SerializationError,
    }
}

unsafe fn report(out_error: *mut PrecistatError, code: ErrorCode, msg: &str) {
    if !out_error.is_null() {
        (*out_error).set(code, msg);
    }
}

/// Engine configured from `PRECISTAT_DIGITS` / `PRECISTAT_ROUNDING`, read
/// once per process
fn engine() -> StatsResult<Engine> {
    static ENGINE: OnceLock<StatsResult<Engine>> = OnceLock::new();
    ENGINE.get_or_init(Engine::from_env).clone()
}

/// Precision for a call; 0 digits selects the library default
fn context(digits: u32) -> StatsResult<PrecisionContext> {
    if digits == 0 {
        Ok(PrecisionContext::default())
    } else {
        PrecisionContext::with_digits(digits)
    }
}

fn optional(value: Option<&Decimal>) -> f64 {
    value.map(Decimal::to_f64).unwrap_or(f64::NAN)
}

fn to_ffi(result: &TestResult) -> TestResultFFI {
    let interval = result.confidence_interval.as_ref();
    TestResultFFI {
        statistic: result.statistic.to_f64(),
        p_value: result.p_value.to_f64(),
        df: optional(result.degrees_of_freedom.as_ref()),
        effect_size: optional(result.effect_size.as_ref()),
        ci_lower: optional(interval.and_then(|ci| ci.lower.as_ref())),
        ci_upper: optional(interval.and_then(|ci| ci.upper.as_ref())),
        n: result.n,
        extreme_flag: result.extreme_flag,
    }
}

fn t_options(options: &TTestOptionsFFI, ctx: PrecisionContext) -> StatsResult<TTestOptions> {
    let mut opts = TTestOptions {
        alternative: options.alternative.into(),
        kind: options.kind.into(),
        mu: ctx.from_f64(options.mu)?,
        ..TTestOptions::default()
    };
    if options.confidence_level != 0.0 {
        opts.confidence_level = ctx.from_f64(options.confidence_level)?;
    }
    Ok(opts)
}

/// Drop positions where either side is NULL, keeping pairs aligned
unsafe fn paired_values(x: &DataArray, y: &DataArray) -> StatsResult<(Vec<f64>, Vec<f64>)> {
    if x.len != y.len {
        return Err(StatsError::ShapeMismatch(format!(
            "paired samples must have equal length, got {} and {}",
            x.len, y.len
        )));
    }
    if x.data.is_null() || y.data.is_null() {
        return Ok((Vec::new(), Vec::new()));
    }
    Ok((0..x.len)
        .filter(|&i| x.is_valid(i) && y.is_valid(i))
        .map(|i| (*x.data.add(i), *y.data.add(i)))
        .unzip())
}

/// Run a JSON-encoded request through the engine
///
/// The request is an object with a `"test"` field naming the computation
/// and an optional `"precision"` object; without one, the precision read
/// from the environment on the first call applies. The response is a newly allocated
/// JSON string that must be released with [`precistat_free_string`].
///
/// # Safety
/// - `request` must be a valid NUL-terminated string
/// - `out_json` must be a valid pointer
/// - `out_error` can be NULL
///
/// # Returns
/// `true` on success, `false` on error (check `out_error` for details)
#[no_mangle]
pub unsafe extern "C" fn precistat_run_json(
    request: *const c_char,
    out_json: *mut *mut c_char,
    out_error: *mut PrecistatError,
) -> bool {
    if !out_error.is_null() {
        *out_error = PrecistatError::success();
    }

    if request.is_null() || out_json.is_null() {
        report(out_error, ErrorCode::InvalidInput, "request or out_json is NULL");
        return false;
    }

    let request = match CStr::from_ptr(request).to_str() {
        Ok(s) => s,
        Err(_) => {
            report(out_error, ErrorCode::InvalidInput, "request is not valid UTF-8");
            return false;
        }
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        engine()?.run_json(request)
    }));

    let result = match result {
        Ok(r) => r,
        Err(_) => {
            report(out_error, ErrorCode::InternalError, "Internal panic in engine");
            return false;
        }
    };

    match result {
        Ok(json) => match CString::new(json) {
            Ok(c) => {
                *out_json = c.into_raw();
                true
            }
            Err(_) => {
                report(out_error, ErrorCode::SerializationError, "response contains NUL byte");
                false
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "engine request failed");
            report(out_error, error_to_code(&e), &e.to_string());
            false
        }
    }
}

/// Free a string returned by [`precistat_run_json`]
///
/// # Safety
/// `s` must be NULL or a pointer previously returned by precistat_run_json
#[no_mangle]
pub unsafe extern "C" fn precistat_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// One-sample t-test against `options.mu`
///
/// NULL entries in `sample` are skipped.
///
/// # Safety
/// - `sample` must be a valid DataArray
/// - `out_result` must be a valid pointer
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn precistat_one_sample_t_test(
    sample: DataArray,
    options: TTestOptionsFFI,
    out_result: *mut TestResultFFI,
    out_error: *mut PrecistatError,
) -> bool {
    if !out_error.is_null() {
        *out_error = PrecistatError::success();
    }

    if out_result.is_null() {
        report(out_error, ErrorCode::InvalidInput, "out_result is NULL");
        return false;
    }

    let values = sample.valid_values();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let ctx = context(options.digits)?;
        let opts = t_options(&options, ctx)?;
        one_sample_t_test(&ctx.sample(&values)?, &opts, ctx)
    }));

    match result {
        Ok(Ok(test)) => {
            *out_result = to_ffi(&test);
            true
        }
        Ok(Err(e)) => {
            report(out_error, error_to_code(&e), &e.to_string());
            false
        }
        Err(_) => {
            report(out_error, ErrorCode::InternalError, "Internal panic in one-sample t-test");
            false
        }
    }
}

/// Two-sample t-test (Welch, Student or paired per `options.kind`)
///
/// NULL entries are skipped; for paired tests a pair is skipped when either
/// side is NULL.
///
/// # Safety
/// - `group1` and `group2` must be valid DataArrays
/// - `out_result` must be a valid pointer
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn precistat_t_test(
    group1: DataArray,
    group2: DataArray,
    options: TTestOptionsFFI,
    out_result: *mut TestResultFFI,
    out_error: *mut PrecistatError,
) -> bool {
    if !out_error.is_null() {
        *out_error = PrecistatError::success();
    }

    if out_result.is_null() {
        report(out_error, ErrorCode::InvalidInput, "out_result is NULL");
        return false;
    }

    let values = if options.kind == TTestKindFFI::Paired {
        paired_values(&group1, &group2)
    } else {
        Ok((group1.valid_values(), group2.valid_values()))
    };
    let (x, y) = match values {
        Ok(v) => v,
        Err(e) => {
            report(out_error, error_to_code(&e), &e.to_string());
            return false;
        }
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let ctx = context(options.digits)?;
        let opts = t_options(&options, ctx)?;
        t_test(&ctx.sample(&x)?, &ctx.sample(&y)?, &opts, ctx)
    }));

    match result {
        Ok(Ok(test)) => {
            *out_result = to_ffi(&test);
            true
        }
        Ok(Err(e)) => {
            report(out_error, error_to_code(&e), &e.to_string());
            false
        }
        Err(_) => {
            report(out_error, ErrorCode::InternalError, "Internal panic in t-test");
            false
        }
    }
}

/// One-way ANOVA over `group_count` groups
///
/// # Safety
/// - `groups` must point to `group_count` valid DataArray structs
/// - `out_result` must be a valid pointer
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn precistat_one_way_anova(
    groups: *const DataArray,
    group_count: usize,
    kind: AnovaKindFFI,
    digits: u32,
    out_result: *mut AnovaResultFFI,
    out_error: *mut PrecistatError,
) -> bool {
    if !out_error.is_null() {
        *out_error = PrecistatError::success();
    }

    if groups.is_null() || out_result.is_null() {
        report(out_error, ErrorCode::InvalidInput, "groups or out_result is NULL");
        return false;
    }

    let raw: Vec<Vec<f64>> = slice::from_raw_parts(groups, group_count)
        .iter()
        .map(|g| g.valid_values())
        .collect();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let ctx = context(digits)?;
        let samples = raw.iter().map(|g| ctx.sample(g)).collect::<StatsResult<Vec<_>>>()?;
        one_way_anova(&samples, &AnovaOptions { kind: kind.into() }, ctx)
    }));

    match result {
        Ok(Ok(anova)) => {
            *out_result = AnovaResultFFI {
                f_statistic: anova.test.statistic.to_f64(),
                p_value: anova.test.p_value.to_f64(),
                df_between: anova.df_between as f64,
                df_within: optional(anova.test.degrees_of_freedom.as_ref()),
                ss_between: anova.ss_between.to_f64(),
                ss_within: anova.ss_within.to_f64(),
                ss_total: anova.ss_total.to_f64(),
                eta_squared: optional(anova.eta_squared.as_ref()),
                n: anova.test.n,
                extreme_flag: anova.test.extreme_flag,
            };
            true
        }
        Ok(Err(e)) => {
            report(out_error, error_to_code(&e), &e.to_string());
            false
        }
        Err(_) => {
            report(out_error, ErrorCode::InternalError, "Internal panic in ANOVA");
            false
        }
    }
}

/// Adjust `len` raw p-values for multiple comparisons
///
/// The adjusted values are written to a newly allocated array in input
/// order; release it with [`precistat_free_doubles`].
///
/// # Safety
/// - `p_values` must point to `len` valid doubles
/// - `out_adjusted` must be a valid pointer
/// - `out_error` can be NULL
#[no_mangle]
pub unsafe extern "C" fn precistat_adjust_p_values(
    p_values: *const f64,
    len: usize,
    method: CorrectionMethodFFI,
    digits: u32,
    out_adjusted: *mut *mut f64,
    out_error: *mut PrecistatError,
) -> bool {
    if !out_error.is_null() {
        *out_error = PrecistatError::success();
    }

    if (p_values.is_null() && len > 0) || out_adjusted.is_null() {
        report(out_error, ErrorCode::InvalidInput, "p_values or out_adjusted is NULL");
        return false;
    }

    let raw: &[f64] = if len == 0 { &[] } else { slice::from_raw_parts(p_values, len) };
    let method = match method {
        CorrectionMethodFFI::Bonferroni => CorrectionMethod::Bonferroni,
        CorrectionMethodFFI::Holm => CorrectionMethod::Holm,
        CorrectionMethodFFI::BenjaminiHochberg => CorrectionMethod::BenjaminiHochberg,
        CorrectionMethodFFI::Sidak => CorrectionMethod::Sidak,
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let ctx = context(digits)?;
        adjust_p_values(&ctx.sample(raw)?, method, ctx)
    }));

    let adjusted = match result {
        Ok(Ok(a)) => a,
        Ok(Err(e)) => {
            report(out_error, error_to_code(&e), &e.to_string());
            return false;
        }
        Err(_) => {
            report(out_error, ErrorCode::InternalError, "Internal panic in p-value adjustment");
            return false;
        }
    };

    let out_ptr = libc::malloc(len.max(1) * std::mem::size_of::<f64>()) as *mut f64;
    if out_ptr.is_null() {
        report(out_error, ErrorCode::AllocationFailure, "Failed to allocate adjusted p-values");
        return false;
    }
    for (i, p) in adjusted.iter().enumerate() {
        *out_ptr.add(i) = p.to_f64();
    }
    *out_adjusted = out_ptr;
    true
}

/// Free memory allocated by precistat_adjust_p_values
///
/// # Safety
/// `values` must be NULL or a pointer previously returned by precistat_adjust_p_values
#[no_mangle]
pub unsafe extern "C" fn precistat_free_doubles(values: *mut f64) {
    if !values.is_null() {
        libc::free(values as *mut libc::c_void);
    }
}

/// Get library version string
#[no_mangle]
pub extern "C" fn precistat_version() -> *const libc::c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const libc::c_char
}
