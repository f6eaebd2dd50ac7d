//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A release with the same version already exists for the repository.
    ///
    /// Raised when a concurrent writer won the race past a read-before-insert
    /// check; callers should re-read and reuse the existing row.
    #[display("release version already recorded for repository")]
    Constraint,
    /// A stored value could not be converted into its domain type.
    #[display("invalid store data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Classify a SQLx error, splitting uniqueness violations out from every
    /// other database failure.
    #[track_caller]
    pub(crate) fn database(err: sqlx::Error) -> Error {
        let kind = match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Constraint,
            _ => Self::Database,
        };
        exn::Exn::from(err).raise(kind)
    }
}
