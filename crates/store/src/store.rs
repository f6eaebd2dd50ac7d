//! Combined store for Repository, Release and SeenStatus entities.
//!
//! They're tightly coupled: a release can't exist without its repository, and
//! a seen flag can't exist without its release. Any write that spans more than
//! one of them runs inside a single transaction.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{LatestJoinRow, Release, ReleaseId, ReleaseRow, Repository, RepositoryId, RepositoryRow};
use crate::resolve_seen;
use exn::ResultExt;
use reltrack_source::ReleaseInfo;
use sqlx::{SqliteExecutor, SqlitePool};

/// A release together with its resolved seen flag.
pub type LatestRelease = (Release, bool);
type RepositoryResult = (Repository, Option<LatestRelease>);

/// Store for managing tracked repositories, their releases and seen flags.
///
/// # Relationships
///
/// - A repository owns zero or more releases
/// - At most one release exists per `(repository, version)`; the database
///   rejects a second insert with [`ErrorKind::Constraint`]
/// - Every release recorded through this store gets its seen flag in the same
///   transaction
/// - Deleting a repository cascades to its releases and their seen flags
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}
impl From<&Database> for Store {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Store {
    /// Create a new store with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// List every tracked repository with its latest release (if any) and that
    /// release's seen flag, in insertion order.
    pub async fn list_repositories_with_latest_release(&self) -> Result<Vec<RepositoryResult>> {
        let rows: Vec<LatestJoinRow> = sqlx::query_as(include_str!("../queries/list_repositories_with_latest_release.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn get_repository(&self, id: RepositoryId) -> Result<Option<Repository>> {
        let row: Option<RepositoryRow> = sqlx::query_as(include_str!("../queries/get_repository.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(Repository::from))
    }

    /// Insert a repository row on its own.
    pub async fn insert_repository(
        &self,
        owner: &str,
        name: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<Repository> {
        Self::insert_repository_on(&self.pool, owner, name, url, description).await
    }

    /// Start tracking a repository: insert it and, when upstream reported one,
    /// its latest release with a fresh `seen = false` flag.
    ///
    /// All rows are written in one transaction. A brand-new repository has no
    /// prior releases, so no version deduplication is needed here.
    pub async fn track(
        &self,
        owner: &str,
        name: &str,
        url: &str,
        description: Option<&str>,
        latest: Option<&ReleaseInfo>,
    ) -> Result<RepositoryResult> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let repository = Self::insert_repository_on(&mut *tx, owner, name, url, description).await?;
        let release = match latest {
            Some(info) => {
                let release = Self::insert_release_on(&mut *tx, repository.id, info).await?;
                Self::insert_seen_status_on(&mut *tx, release.id, false).await?;
                Some((release, false))
            },
            None => None,
        };
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok((repository, release))
    }

    /// Overwrite the stored description.
    ///
    /// Returns `false` if the repository does not exist.
    pub async fn update_repository_description(&self, id: RepositoryId, description: Option<&str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/update_repository_description.sql"))
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a repository, cascading to its releases and their seen flags.
    ///
    /// Returns the deleted id, or `None` if no such repository existed.
    pub async fn delete_repository(&self, id: RepositoryId) -> Result<Option<RepositoryId>> {
        let deleted: Option<i64> = sqlx::query_scalar(include_str!("../queries/delete_repository.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(deleted.map(RepositoryId::from))
    }

    // =========================================================================
    // Releases
    // =========================================================================

    /// Insert a release row without a seen flag.
    ///
    /// Always attempts a new row; raises [`ErrorKind::Constraint`] if the
    /// version is already recorded for the repository. Prefer
    /// [`record_release`](Self::record_release), which also creates the flag.
    pub async fn insert_release(&self, repository_id: RepositoryId, info: &ReleaseInfo) -> Result<Release> {
        Self::insert_release_on(&self.pool, repository_id, info).await
    }

    /// Record a newly observed release together with its `seen = false` flag.
    ///
    /// Both rows are written in one transaction: either both exist afterwards
    /// or neither does. Raises [`ErrorKind::Constraint`] if a concurrent
    /// writer already recorded this version.
    pub async fn record_release(&self, repository_id: RepositoryId, info: &ReleaseInfo) -> Result<Release> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let release = Self::insert_release_on(&mut *tx, repository_id, info).await?;
        Self::insert_seen_status_on(&mut *tx, release.id, false).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(release)
    }

    pub async fn find_release_by_version(
        &self,
        repository_id: RepositoryId,
        version: impl AsRef<str>,
    ) -> Result<Option<Release>> {
        let row: Option<ReleaseRow> = sqlx::query_as(include_str!("../queries/find_release_by_version.sql"))
            .bind(repository_id)
            .bind(version.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Release::try_from).transpose()
    }

    /// Id of the repository's latest release.
    ///
    /// Undated releases rank above dated ones. Otherwise the greatest release
    /// date wins, and ties go to the most recently inserted row.
    pub async fn find_latest_release_id(&self, repository_id: RepositoryId) -> Result<Option<ReleaseId>> {
        let id: Option<i64> = sqlx::query_scalar(include_str!("../queries/find_latest_release_id.sql"))
            .bind(repository_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id.map(ReleaseId::from))
    }

    /// The repository's latest release joined with its resolved seen flag.
    pub async fn find_latest_release(&self, repository_id: RepositoryId) -> Result<Option<LatestRelease>> {
        let row: Option<(i64, i64, String, Option<i64>, Option<String>, Option<bool>)> =
            sqlx::query_as(include_str!("../queries/find_latest_release.sql"))
                .bind(repository_id)
                .fetch_optional(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        row.map(|(id, repository_id, version, release_date, release_notes, seen)| {
            let row = ReleaseRow { id, repository_id, version, release_date, release_notes };
            Ok((Release::try_from(row)?, resolve_seen(seen)))
        })
        .transpose()
    }

    // =========================================================================
    // Seen Status
    // =========================================================================

    pub async fn insert_seen_status(&self, release_id: ReleaseId, seen: bool) -> Result<()> {
        Self::insert_seen_status_on(&self.pool, release_id, seen).await
    }

    /// Raw seen flag of a release; `None` when no flag row exists. Use
    /// [`resolve_seen`] to turn it into the user-facing value.
    pub async fn get_seen_status(&self, release_id: ReleaseId) -> Result<Option<bool>> {
        sqlx::query_scalar(include_str!("../queries/get_seen_status.sql"))
            .bind(release_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Flip the seen flag of a release and return the new value.
    ///
    /// A release without a flag row is implicitly unseen, so toggling it
    /// creates the row with `seen = true`. The flip happens in a single
    /// statement, so concurrent toggles never lose an update.
    pub async fn toggle_seen_status(&self, release_id: ReleaseId) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/toggle_seen_status.sql"))
            .bind(release_id)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Executor-generic helpers, shared between pool and transaction callers
    // =========================================================================

    async fn insert_repository_on<'e>(
        executor: impl SqliteExecutor<'e>,
        owner: &str,
        name: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<Repository> {
        let row: RepositoryRow = sqlx::query_as(include_str!("../queries/insert_repository.sql"))
            .bind(owner)
            .bind(name)
            .bind(url)
            .bind(description)
            .fetch_one(executor)
            .await
            .map_err(ErrorKind::database)?;
        Ok(Repository::from(row))
    }

    async fn insert_release_on<'e>(
        executor: impl SqliteExecutor<'e>,
        repository_id: RepositoryId,
        info: &ReleaseInfo,
    ) -> Result<Release> {
        let row: ReleaseRow = sqlx::query_as(include_str!("../queries/insert_release.sql"))
            .bind(repository_id)
            .bind(&info.version)
            .bind(ReleaseRow::encode_date(info))
            .bind(info.release_notes.as_deref())
            .fetch_one(executor)
            .await
            .map_err(ErrorKind::database)?;
        Release::try_from(row)
    }

    async fn insert_seen_status_on<'e>(executor: impl SqliteExecutor<'e>, release_id: ReleaseId, seen: bool) -> Result<()> {
        sqlx::query(include_str!("../queries/insert_seen_status.sql"))
            .bind(release_id)
            .bind(seen)
            .execute(executor)
            .await
            .map_err(ErrorKind::database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    async fn store() -> Store {
        Database::connect_in_memory().await.unwrap().store()
    }

    async fn widget(store: &Store) -> Repository {
        store
            .insert_repository("acme", "widget", "https://github.com/acme/widget", Some("Widgets"))
            .await
            .unwrap()
    }

    async fn count(store: &Store, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(&store.pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_repository() {
        let store = store().await;
        let repo = widget(&store).await;
        let fetched = store.get_repository(repo.id).await.unwrap().unwrap();
        assert_eq!(fetched, repo);
        assert_eq!(fetched.url, "https://github.com/acme/widget");
        assert!(store.get_repository(RepositoryId::from(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_track_without_release() {
        let store = store().await;
        let (repo, release) = store.track("acme", "widget", "https://github.com/acme/widget", None, None).await.unwrap();
        assert!(release.is_none());
        assert!(repo.description.is_none());
        assert_eq!(count(&store, "releases").await, 0);
    }

    #[tokio::test]
    async fn test_track_with_release_starts_unseen() {
        let store = store().await;
        let info = ReleaseInfo::new("v1.0.0").with_date(datetime!(2024-01-01 0:00 UTC)).with_notes("Initial");
        let (repo, release) = store.track("acme", "widget", "url", None, Some(&info)).await.unwrap();
        let (release, seen) = release.unwrap();
        assert!(!seen);
        assert_eq!(release.repository_id, repo.id);
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_record_release_rejects_duplicate_version() {
        let store = store().await;
        let repo = widget(&store).await;
        let info = ReleaseInfo::new("v1.0.0");
        store.record_release(repo.id, &info).await.unwrap();
        let err = store.record_release(repo.id, &info).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Constraint));
        assert_eq!(count(&store, "releases").await, 1);
        assert_eq!(count(&store, "seen_status").await, 1);
    }

    #[tokio::test]
    async fn test_same_version_allowed_across_repositories() {
        let store = store().await;
        let a = widget(&store).await;
        let b = store.insert_repository("acme", "gadget", "url", None).await.unwrap();
        let info = ReleaseInfo::new("v1.0.0");
        store.record_release(a.id, &info).await.unwrap();
        store.record_release(b.id, &info).await.unwrap();
        assert_eq!(count(&store, "releases").await, 2);
    }

    #[tokio::test]
    async fn test_find_release_by_version() {
        let store = store().await;
        let repo = widget(&store).await;
        let recorded = store.record_release(repo.id, &ReleaseInfo::new("v1.0.0").with_notes("notes")).await.unwrap();
        let found = store.find_release_by_version(repo.id, "v1.0.0").await.unwrap().unwrap();
        assert_eq!(found, recorded);
        assert!(store.find_release_by_version(repo.id, "v9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_release_by_date_then_insertion() {
        let store = store().await;
        let repo = widget(&store).await;
        let newer = store
            .record_release(repo.id, &ReleaseInfo::new("v2").with_date(datetime!(2024-06-01 0:00 UTC)))
            .await
            .unwrap();
        // Recorded later, but published earlier.
        store
            .record_release(repo.id, &ReleaseInfo::new("v1").with_date(datetime!(2024-01-01 0:00 UTC)))
            .await
            .unwrap();
        assert_eq!(store.find_latest_release_id(repo.id).await.unwrap(), Some(newer.id));

        let tied = store
            .record_release(repo.id, &ReleaseInfo::new("v2-hotfix").with_date(datetime!(2024-06-01 0:00 UTC)))
            .await
            .unwrap();
        assert_eq!(store.find_latest_release_id(repo.id).await.unwrap(), Some(tied.id));
        let (latest, seen) = store.find_latest_release(repo.id).await.unwrap().unwrap();
        assert_eq!(latest.version, "v2-hotfix");
        assert!(!seen);
    }

    #[tokio::test]
    async fn test_undated_release_is_latest() {
        let store = store().await;
        let repo = widget(&store).await;
        store
            .record_release(repo.id, &ReleaseInfo::new("v1").with_date(datetime!(2024-06-01 0:00 UTC)))
            .await
            .unwrap();
        let nightly = store.record_release(repo.id, &ReleaseInfo::new("nightly")).await.unwrap();
        assert_eq!(store.find_latest_release_id(repo.id).await.unwrap(), Some(nightly.id));
        assert_eq!(store.find_latest_release(repo.id).await.unwrap().unwrap().0.id, nightly.id);
        let listed = store.list_repositories_with_latest_release().await.unwrap();
        assert_eq!(listed[0].1.as_ref().unwrap().0.id, nightly.id);

        // Among undated releases, the most recent insert wins.
        let canary = store.record_release(repo.id, &ReleaseInfo::new("canary")).await.unwrap();
        assert_eq!(store.find_latest_release_id(repo.id).await.unwrap(), Some(canary.id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("toggle.sqlite"), None).await.unwrap();
        let store = db.store();
        let repo = widget(&store).await;
        let release = store.record_release(repo.id, &ReleaseInfo::new("v1")).await.unwrap();

        let toggles: Vec<_> = (0..9)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.toggle_seen_status(release.id).await })
            })
            .collect();
        let mut seen = 0;
        for toggle in toggles {
            if toggle.await.unwrap().unwrap() {
                seen += 1;
            }
        }
        // Each toggle observed a distinct state: five flips to true, four to false.
        assert_eq!(seen, 5);
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), Some(true));
        db.close().await;
    }

    #[tokio::test]
    async fn test_latest_release_absent() {
        let store = store().await;
        let repo = widget(&store).await;
        assert!(store.find_latest_release_id(repo.id).await.unwrap().is_none());
        assert!(store.find_latest_release(repo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_seen_status_flips() {
        let store = store().await;
        let repo = widget(&store).await;
        let release = store.record_release(repo.id, &ReleaseInfo::new("v1")).await.unwrap();
        assert!(store.toggle_seen_status(release.id).await.unwrap());
        assert!(!store.toggle_seen_status(release.id).await.unwrap());
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_toggle_seen_status_creates_missing_row() {
        let store = store().await;
        let repo = widget(&store).await;
        let release = store.insert_release(repo.id, &ReleaseInfo::new("v1")).await.unwrap();
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), None);
        assert!(store.toggle_seen_status(release.id).await.unwrap());
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_insert_seen_status_explicit() {
        let store = store().await;
        let repo = widget(&store).await;
        let release = store.insert_release(repo.id, &ReleaseInfo::new("v1")).await.unwrap();
        store.insert_seen_status(release.id, true).await.unwrap();
        assert_eq!(store.get_seen_status(release.id).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_update_description() {
        let store = store().await;
        let repo = widget(&store).await;
        assert!(store.update_repository_description(repo.id, None).await.unwrap());
        assert!(store.get_repository(repo.id).await.unwrap().unwrap().description.is_none());
        assert!(!store.update_repository_description(RepositoryId::from(404), Some("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = store().await;
        let repo = widget(&store).await;
        let other = store.insert_repository("acme", "gadget", "url", None).await.unwrap();
        store.record_release(repo.id, &ReleaseInfo::new("v1")).await.unwrap();
        store.record_release(repo.id, &ReleaseInfo::new("v2")).await.unwrap();
        store.record_release(other.id, &ReleaseInfo::new("v1")).await.unwrap();

        assert_eq!(store.delete_repository(repo.id).await.unwrap(), Some(repo.id));
        assert_eq!(count(&store, "releases").await, 1);
        assert_eq!(count(&store, "seen_status").await, 1);
        assert_eq!(store.delete_repository(repo.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_with_latest_release() {
        let store = store().await;
        let empty = store.insert_repository("acme", "empty", "url", None).await.unwrap();
        let repo = widget(&store).await;
        store
            .record_release(repo.id, &ReleaseInfo::new("v1").with_date(datetime!(2024-01-01 0:00 UTC)))
            .await
            .unwrap();
        let latest = store
            .record_release(repo.id, &ReleaseInfo::new("v2").with_date(datetime!(2024-02-01 0:00 UTC)))
            .await
            .unwrap();
        store.toggle_seen_status(latest.id).await.unwrap();
        // A release without a seen row still lists, as unseen.
        let bare = store.insert_repository("acme", "bare", "url", None).await.unwrap();
        store.insert_release(bare.id, &ReleaseInfo::new("v0")).await.unwrap();

        let listed = store.list_repositories_with_latest_release().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].0.id, empty.id);
        assert!(listed[0].1.is_none());
        let (release, seen) = listed[1].1.as_ref().unwrap();
        assert_eq!(release.id, latest.id);
        assert!(*seen);
        let (release, seen) = listed[2].1.as_ref().unwrap();
        assert_eq!(release.version, "v0");
        assert!(!*seen);
    }
}
