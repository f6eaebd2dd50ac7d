//! Source Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The repository does not exist upstream (or is not visible to us).
    ///
    /// Distinct from "exists but has no releases", which is not an error.
    #[display("repository not found upstream: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Transport failure, timeout, rate limiting or a provider-side error.
    #[display("upstream unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The provider answered, but not with anything we understand.
    #[display("invalid upstream response")]
    InvalidResponse,
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
