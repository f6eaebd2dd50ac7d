use crate::error::{Error, ErrorKind};
use crate::models::{ReleaseId, RepositoryId};
use exn::ResultExt;
use reltrack_source::ReleaseInfo;
use time::OffsetDateTime;

/// A release observed upstream and recorded against a tracked repository.
///
/// Rows are immutable once stored: a new upstream version becomes a new row,
/// never an update to an existing one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Release {
    pub id: ReleaseId,
    pub repository_id: RepositoryId,
    pub version: String,
    pub release_date: Option<OffsetDateTime>,
    pub release_notes: Option<String>,
}

/// Resolve the stored seen flag of a release.
///
/// A release without a `seen_status` row has never been acknowledged, so it
/// reads as unseen. Every read path goes through this function instead of
/// coalescing a missing row on its own.
pub fn resolve_seen(status: Option<bool>) -> bool {
    status.unwrap_or(false)
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReleaseRow {
    pub(crate) id: i64,
    pub(crate) repository_id: i64,
    pub(crate) version: String,
    pub(crate) release_date: Option<i64>,
    pub(crate) release_notes: Option<String>,
}
impl ReleaseRow {
    /// Storage representation of an upstream release date.
    pub(crate) fn encode_date(info: &ReleaseInfo) -> Option<i64> {
        info.release_date.map(OffsetDateTime::unix_timestamp)
    }
}
impl TryFrom<ReleaseRow> for Release {
    type Error = Error;
    fn try_from(row: ReleaseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReleaseId::from(row.id),
            repository_id: RepositoryId::from(row.repository_id),
            version: row.version,
            release_date: row
                .release_date
                .map(|d| OffsetDateTime::from_unix_timestamp(d).or_raise(|| ErrorKind::InvalidData("release date")))
                .transpose()?,
            release_notes: row.release_notes,
        })
    }
}
