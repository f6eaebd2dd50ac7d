//! Tracker Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use reltrack_source::error::{Error as SourceError, ErrorKind as SourceErrorKind};
use reltrack_store::RepositoryId;

/// A tracker error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The `owner/name` pair does not resolve upstream. Nothing was written.
    #[display("repository does not exist upstream: {_0}")]
    UpstreamNotFound(#[error(not(source))] String),
    /// The upstream provider could not be reached. Nothing was written.
    #[display("upstream provider unavailable")]
    UpstreamUnavailable,
    /// The upstream provider answered with something unusable.
    #[display("upstream provider error")]
    Upstream,
    /// No tracked repository has this id.
    #[display("repository not found: {_0}")]
    NotFound(#[error(not(source))] RepositoryId),
    #[display("store error")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable)
    }

    /// Convert a provider error, keeping "does not exist" and "try again
    /// later" distinguishable for the caller.
    #[track_caller]
    pub(crate) fn upstream(err: SourceError) -> Error {
        let kind = match &*err {
            SourceErrorKind::NotFound(slug) => Self::UpstreamNotFound(slug.clone()),
            kind if kind.is_retryable() => Self::UpstreamUnavailable,
            _ => Self::Upstream,
        };
        err.raise(kind)
    }
}
