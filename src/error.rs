//! Error types for binding and evaluation.

use std::backtrace::Backtrace;
use std::fmt;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes carried by every [`Error`].
///
/// Structural codes are surfaced at bind time only; `MemoryExceeded` can
/// surface whenever an allocator budget runs out; `EvaluationError` is
/// reserved for strict evaluation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A name was not found in the schema it was resolved against.
    AttributeMissing = 1,
    /// A duplicate name was produced in a result schema.
    AttributeExists = 2,
    /// A positional reference or alias list does not match the schema width.
    AttributeCountMismatch = 3,
    /// Operand types are incompatible.
    TypeMismatch = 4,
    /// An allocator refused a reservation.
    MemoryExceeded = 5,
    /// A runtime value error under a strict evaluation policy.
    EvaluationError = 6,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::AttributeMissing => "ATTRIBUTE_MISSING",
            ErrorCode::AttributeExists => "ATTRIBUTE_EXISTS",
            ErrorCode::AttributeCountMismatch => "ATTRIBUTE_COUNT_MISMATCH",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::MemoryExceeded => "MEMORY_EXCEEDED",
            ErrorCode::EvaluationError => "EVALUATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bind-time or evaluation failure.
///
/// Carries a stable [`ErrorCode`], a human-readable message, and a backtrace
/// captured at construction (populated when `RUST_BACKTRACE` is set). As a
/// failure propagates out of a composite bind, each level appends the
/// rendering of its logical spec so the failure is self-locating in a plan.
#[derive(Debug)]
pub struct Error {
    code: ErrorCode,
    message: String,
    backtrace: Backtrace,
}

impl Error {
    /// Creates a new error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            code,
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the backtrace captured when the error was created.
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Appends the description of the operation the error passed through.
    #[must_use]
    pub fn with_context(mut self, operation: &str) -> Self {
        self.message.push_str("\n  while binding: ");
        self.message.push_str(operation);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}
