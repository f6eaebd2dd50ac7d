mod id;
mod join;
mod release;
mod repository;

pub use self::id::{ReleaseId, RepositoryId};
pub(crate) use self::join::LatestJoinRow;
pub use self::release::{Release, resolve_seen};
pub(crate) use self::release::ReleaseRow;
pub use self::repository::Repository;
pub(crate) use self::repository::RepositoryRow;
