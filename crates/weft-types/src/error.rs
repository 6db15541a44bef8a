//! Error-code convention for weft.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so the
//! CLI, the logs and callers of the orchestrator can classify failures
//! without matching on message text.
//!
//! # Prefixes
//!
//! | Layer | Prefix |
//! |-------|--------|
//! | Wire envelopes | `EVENT_` |
//! | RPC correlator | `RPC_` |
//! | Worker pool | `POOL_` |
//! | Filesystem | `FS_` |
//! | Asset sync | `SYNC_` |
//! | Build engine | `ENGINE_` |
//! | Build options | `OPTIONS_` |
//! | Dependency installer | `INSTALL_` |
//! | Orchestrator | `ORCH_` |

/// Machine-readable error classification.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE, prefixed with the layer (see module docs)
/// - Stable once published
///
/// # Example
///
/// ```
/// use weft_types::ErrorCode;
///
/// #[derive(Debug)]
/// enum PoolError {
///     NotStarted,
///     WorkerGone,
/// }
///
/// impl ErrorCode for PoolError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::NotStarted => "POOL_NOT_STARTED",
///             Self::WorkerGone => "POOL_WORKER_GONE",
///         }
///     }
///
///     fn is_recoverable(&self) -> bool {
///         matches!(self, Self::WorkerGone)
///     }
/// }
///
/// assert_eq!(PoolError::WorkerGone.code(), "POOL_WORKER_GONE");
/// assert!(!PoolError::NotStarted.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying (or a caller-side fix) may succeed.
    ///
    /// Nothing inside weft retries automatically; this only informs the
    /// caller.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows the workspace conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use weft_types::{assert_error_code, ErrorCode};
///
/// struct Gone;
///
/// impl ErrorCode for Gone {
///     fn code(&self) -> &'static str { "RPC_GONE" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&Gone, "RPC_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] for every element.
///
/// Use it with an `all_variants()` helper in each error module's tests.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
