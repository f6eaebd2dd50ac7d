use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open release database")]
    Database,
    #[display("could not set up release provider")]
    Source,
    /// The `add` target is neither `owner/name` nor `owner name`.
    #[display("invalid repository {_0:?}: expected owner/name")]
    InvalidTarget(#[error(not(source))] String),
    #[display("tracker operation failed")]
    Tracker,
    /// `refresh --all` completed, but some repositories could not be refreshed.
    #[display("{_0} repositories failed to refresh")]
    PartialRefresh(#[error(not(source))] usize),
    #[display("could not write output")]
    Output,
}
