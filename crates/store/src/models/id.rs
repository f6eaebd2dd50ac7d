use derive_more::{Display, From, FromStr, Into};
use serde::Serialize;

/// Store-assigned identity of a tracked repository.
///
/// Backed by an `AUTOINCREMENT` key, so an id is never handed out twice, even
/// after the repository it belonged to was removed.
#[derive(Clone, Copy, Debug, Display, Eq, From, FromStr, Hash, Into, Ord, PartialEq, PartialOrd, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RepositoryId(i64);

/// Store-assigned identity of a recorded release.
#[derive(Clone, Copy, Debug, Display, Eq, From, FromStr, Hash, Into, Ord, PartialEq, PartialOrd, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ReleaseId(i64);
