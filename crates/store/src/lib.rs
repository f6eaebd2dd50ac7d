//! SQLite store for tracked repositories and their releases.
//!
//! # Architecture
//! Three relations make up the persisted state:
//! - **repositories**: what the user asked to track, keyed by a store-assigned id.
//! - **releases**: every upstream version observed for a repository, unique per
//!   `(repository_id, version)`. Rows are never updated after insertion.
//! - **seen_status**: a one-to-one satellite of a release holding the user's
//!   acknowledgment flag.
//!
//! Deleting a repository cascades through releases to their seen flags. The
//! "latest release" of a repository is never stored; it is computed as the
//! release with the greatest `release_date`, ties broken by insertion order.

mod db;
pub mod error;
mod models;
mod store;

pub use crate::db::Database;
pub use crate::models::{Release, ReleaseId, Repository, RepositoryId, resolve_seen};
pub use crate::store::{LatestRelease, Store};
