/// SSM Kernel v1 — Error Types
///
/// Every fallible kernel operation returns `KernelResult<T>`.
/// Recoverable input quirks (missing optional fields, out-of-range
/// posture) never reach this type; they are defaulted or clamped.

use thiserror::Error;

/// Root error type for kernel failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// A required envelope field is absent.
    #[error("envelope #{index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// A field is present but cannot be used (wrong type, non-finite, negative weight).
    #[error("envelope #{index}: invalid value for '{field}': {reason}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// An emitted record broke a kernel invariant.
    #[error("Invariant violation: [INVARIANT:{invariant}] {detail}")]
    Invariant {
        invariant: &'static str,
        detail: String,
    },
}

pub type KernelResult<T> = Result<T, KernelError>;
