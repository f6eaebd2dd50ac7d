use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Merged configuration sources could not be extracted into a [`Config`](crate::Config).
    #[display("invalid configuration")]
    Load,
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    MissingFile(#[error(not(source))] PathBuf),
    /// No home directory, so no platform config/data directories either.
    #[display("could not determine platform directories")]
    Directories,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
