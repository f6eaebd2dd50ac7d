//! Upstream release providers.
//!
//! A [`ReleaseSource`] answers one question about a repository: what is its
//! description and what is its latest published release? Providers are
//! read-only and never retry; retry policy belongs to the caller.

pub mod error;
mod github;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod source;

pub use crate::github::{DEFAULT_API_URL, GitHubSource};
#[cfg(feature = "mock")]
pub use crate::mock::MockSource;
pub use crate::models::{ReleaseInfo, RepositoryDetails};
pub use crate::source::ReleaseSource;
use std::sync::Arc;

pub type SourceHandle = Arc<dyn ReleaseSource + Send + Sync>;
