use crate::error::Error;
use crate::models::{Release, ReleaseRow, Repository, RepositoryRow, resolve_seen};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A repository LEFT JOINed with its latest release and that release's seen
/// flag.
///
/// Repositories without any releases produce NULLs in every release column.
/// A release that exists but has no `seen_status` row produces a NULL `seen`
/// column only, which is resolved through [`resolve_seen`].
pub(crate) struct LatestJoinRow {
    pub(crate) repository: RepositoryRow,
    pub(crate) release: Option<(ReleaseRow, Option<bool>)>,
}
impl<'r> FromRow<'r, SqliteRow> for LatestJoinRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let repository = RepositoryRow::from_row(row)?;
        let release_id: Option<i64> = row.try_get("release_id")?;
        let version: Option<String> = row.try_get("version")?;
        let release = match (release_id, version) {
            (Some(id), Some(version)) => Some((
                ReleaseRow {
                    id,
                    repository_id: repository.id,
                    version,
                    release_date: row.try_get("release_date")?,
                    release_notes: row.try_get("release_notes")?,
                },
                row.try_get("seen")?,
            )),
            (None, None) => None,
            _ => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "release columns".to_string(),
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "LEFT JOIN release columns are partially NULL",
                    )),
                });
            },
        };
        Ok(Self { repository, release })
    }
}
impl TryFrom<LatestJoinRow> for (Repository, Option<(Release, bool)>) {
    type Error = Error;
    fn try_from(join: LatestJoinRow) -> Result<Self, Self::Error> {
        let repository = Repository::from(join.repository);
        let release = join
            .release
            .map(|(row, seen)| Release::try_from(row).map(|release| (release, resolve_seen(seen))))
            .transpose()?;
        Ok((repository, release))
    }
}
