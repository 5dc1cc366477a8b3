//! Error types shared by the analysis and synthesis stages.

use thiserror::Error;

/// Errors raised by the DSP core.
///
/// Cancellation is the common path: every long-running loop polls a
/// [`CancellationToken`](crate::CancellationToken) and unwinds with
/// [`Error::Cancelled`]. The remaining variants are contract violations
/// that callers must not paper over.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The operation observed a cancellation request and aborted.
    #[error("operation cancelled")]
    Cancelled,

    /// The radix-2 transform was handed a buffer whose length is not a power of two.
    #[error("FFT length {len} is not a power of two")]
    FftLength {
        /// Offending buffer length.
        len: usize,
    },

    /// A note name did not follow the `<letter>[#]<octave>` grammar.
    #[error("malformed note name: {0:?}")]
    NoteName(String),

    /// A persisted cache blob could not be restored.
    #[error("cannot restore {cache} cache: {reason}")]
    CacheBlob {
        /// Identity of the cache being restored.
        cache: &'static str,
        /// What was wrong with the blob.
        reason: String,
    },

    /// A parameter was outside its valid range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The input buffer was empty where samples are required.
    #[error("input buffer is empty")]
    EmptyInput,
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Create a cache restore error.
    pub fn cache_blob(cache: &'static str, reason: impl Into<String>) -> Self {
        Error::CacheBlob {
            cache,
            reason: reason.into(),
        }
    }

    /// Whether this error is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
