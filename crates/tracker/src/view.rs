//! Externally visible views of tracked repositories.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reltrack_store::{LatestRelease, ReleaseId, Repository, RepositoryId, Store};
use serde::Serialize;
use time::OffsetDateTime;

/// A release as presented to callers: the stored row plus its seen flag.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseView {
    pub id: ReleaseId,
    pub version: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub release_date: Option<OffsetDateTime>,
    pub release_notes: Option<String>,
    pub seen: bool,
}
impl From<LatestRelease> for ReleaseView {
    fn from((release, seen): LatestRelease) -> Self {
        Self {
            id: release.id,
            version: release.version,
            release_date: release.release_date,
            release_notes: release.release_notes,
            seen,
        }
    }
}

/// A tracked repository with its latest known release, if any.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub id: RepositoryId,
    pub name: String,
    pub owner: String,
    pub url: String,
    pub description: Option<String>,
    pub latest_release: Option<ReleaseView>,
}
impl From<(Repository, Option<LatestRelease>)> for RepositoryView {
    fn from((repository, latest): (Repository, Option<LatestRelease>)) -> Self {
        Self {
            id: repository.id,
            name: repository.name,
            owner: repository.owner,
            url: repository.url,
            description: repository.description,
            latest_release: latest.map(ReleaseView::from),
        }
    }
}

/// Every tracked repository joined with its latest release. Pure read.
pub(crate) async fn list_all(store: &Store) -> Result<Vec<RepositoryView>> {
    let rows = store.list_repositories_with_latest_release().await.or_raise(|| ErrorKind::Store)?;
    Ok(rows.into_iter().map(RepositoryView::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reltrack_store::Release;
    use time::macros::datetime;

    fn repository() -> Repository {
        Repository {
            id: RepositoryId::from(1),
            owner: "acme".to_string(),
            name: "widget".to_string(),
            url: "https://github.com/acme/widget".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_serializes_with_camel_case_fields() {
        let release = Release {
            id: ReleaseId::from(2),
            repository_id: RepositoryId::from(1),
            version: "v1.0.0".to_string(),
            release_date: Some(datetime!(2024-01-01 0:00 UTC)),
            release_notes: Some("Initial".to_string()),
        };
        let view = RepositoryView::from((repository(), Some((release, false))));
        let json: serde_json::Value = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["latestRelease"]["version"], "v1.0.0");
        assert_eq!(json["latestRelease"]["releaseDate"], "2024-01-01T00:00:00Z");
        assert_eq!(json["latestRelease"]["releaseNotes"], "Initial");
        assert_eq!(json["latestRelease"]["seen"], false);
    }

    #[test]
    fn test_serializes_missing_release_as_null() {
        let view = RepositoryView::from((repository(), None));
        let json: serde_json::Value = serde_json::to_value(&view).unwrap();
        assert!(json["latestRelease"].is_null());
        assert!(json["description"].is_null());
    }
}
