//! Error types for rill reactive sets.

use alloc::format;
use alloc::string::String;
use core::fmt;

/// Result type alias for rill operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure kinds surfaced by the library.
///
/// The first three are programming errors at the producer: they surface
/// synchronously at the offending call site and leave the subject state
/// unchanged. `Upstream` wraps an error propagated from an external
/// push-stream and travels through the graph via `on_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An add was attempted while the key is already active.
    DuplicateKey {
        key: String,
    },
    /// An update or delete was attempted for a key that is not active.
    AbsentKey {
        key: String,
    },
    /// An event violated the lifetime algebra (Add on a live token, or
    /// Update/Delete without a prior Add).
    InvalidPrecondition {
        message: String,
    },
    /// An error propagated from an external push-stream.
    Upstream {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateKey { key } => {
                write!(f, "Duplicate key: {}", key)
            }
            Error::AbsentKey { key } => {
                write!(f, "Absent key: {}", key)
            }
            Error::InvalidPrecondition { message } => {
                write!(f, "Invalid precondition: {}", message)
            }
            Error::Upstream { message } => {
                write!(f, "Upstream error: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a duplicate key error.
    pub fn duplicate_key(key: impl fmt::Debug) -> Self {
        Error::DuplicateKey {
            key: format!("{:?}", key),
        }
    }

    /// Creates an absent key error.
    pub fn absent_key(key: impl fmt::Debug) -> Self {
        Error::AbsentKey {
            key: format!("{:?}", key),
        }
    }

    /// Creates an invalid precondition error.
    pub fn invalid_precondition(message: impl Into<String>) -> Self {
        Error::InvalidPrecondition {
            message: message.into(),
        }
    }

    /// Creates an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
        }
    }
}
