//! Error types for berth.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for berth operations.
pub type Result<T> = std::result::Result<T, BerthError>;

/// Main error type for berth.
#[derive(Error, Debug)]
pub enum BerthError {
    // Validation errors (raised before any platform call)
    #[error(
        "Invalid stack name '{name}': must start with a lowercase letter or digit \
         and contain only lowercase letters, digits, '-' or '_'"
    )]
    InvalidStackName { name: String },

    #[error("Invalid stack definition: {reason}")]
    Validation { reason: String },

    // Lookup errors
    #[error("Stack not found: {stack}")]
    NotFound { stack: String },

    // Platform errors
    #[error("Platform call {operation} failed: {source}{}", hint_suffix(.hint))]
    Platform {
        operation: String,
        #[source]
        source: PlatformError,
        hint: Option<String>,
    },

    #[error("Platform call {operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" ({})", hint),
        None => String::new(),
    }
}

impl BerthError {
    /// Create a validation error from anything printable.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Wrap a platform failure for the named operation.
    ///
    /// Platform timeouts are lifted into [`BerthError::Timeout`] so callers can
    /// distinguish an unresponsive engine from a rejected request.
    pub fn platform(operation: impl Into<String>, source: PlatformError) -> Self {
        let operation = operation.into();
        match source {
            PlatformError::Timeout { secs } => Self::Timeout { operation, secs },
            source => Self::Platform { operation, source, hint: None },
        }
    }

    /// Attach a remediation hint to a platform error. Other kinds pass through.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            Self::Platform { operation, source, .. } => {
                Self::Platform { operation, source, hint: Some(hint.into()) }
            }
            other => other,
        }
    }

    /// True for errors raised before any side effect took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidStackName { .. } | Self::Validation { .. })
    }
}

/// Errors reported by a container platform client.
///
/// The status-like variants (`Conflict`, `NotModified`, `NotFound`) are the ones the
/// engine tolerates in specific places; everything else is surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The resource already exists (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request had no effect, e.g. stopping a stopped container (HTTP 304).
    #[error("not modified: {0}")]
    NotModified(String),

    /// The resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other error response from the engine.
    #[error("engine returned {status}: {message}")]
    Api { status: u16, message: String },

    /// No response within the configured deadline.
    #[error("no response within {secs}s")]
    Timeout { secs: u64 },

    /// The engine could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
}

impl PlatformError {
    /// Whether a retry of the same call might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
            || matches!(self, Self::Api { status, .. } if *status >= 500)
    }
}
