use crate::error::{ErrorKind, Result};
use crate::view::{self, RepositoryView};
use exn::{OptionExt, ResultExt};
use reltrack_source::{ReleaseInfo, SourceHandle};
use reltrack_store::error::ErrorKind as StoreErrorKind;
use reltrack_store::{LatestRelease, RepositoryId, Store, resolve_seen};
use serde::Serialize;
use tracing::instrument;

/// Canonical web URL of a GitHub repository.
///
/// Derived once, when the repository is added; stored rows are never
/// re-derived.
pub fn repository_url(owner: &str, name: &str) -> String {
    format!("https://github.com/{owner}/{name}")
}

/// How a refresh reconciled the upstream latest release with stored state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChange {
    /// Upstream reported a version never stored for this repository. It was
    /// recorded as unseen.
    New,
    /// Upstream reported a version that was already stored. Its seen flag was
    /// left untouched.
    Known,
    /// Upstream reported no release at all. Stored releases were left
    /// untouched and the last known one is reported.
    Unpublished,
}

/// The result of refreshing one repository.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Refresh {
    #[serde(rename = "repository")]
    pub view: RepositoryView,
    pub change: ReleaseChange,
}

/// Reconciles upstream release data against stored state.
///
/// Both collaborators are injected: the [`Store`] shares one connection pool
/// between every clone, and the source handle is any
/// [`ReleaseSource`](reltrack_source::ReleaseSource). Operations on different
/// repositories, or even the same repository, may run concurrently.
#[derive(Clone)]
pub struct Tracker {
    store: Store,
    source: SourceHandle,
}

impl Tracker {
    pub fn new(store: Store, source: SourceHandle) -> Self {
        Self { store, source }
    }

    /// Every tracked repository with its latest release and seen flag.
    pub async fn list_repositories(&self) -> Result<Vec<RepositoryView>> {
        view::list_all(&self.store).await
    }

    /// A single tracked repository with its latest release and seen flag.
    pub async fn get(&self, id: RepositoryId) -> Result<Option<RepositoryView>> {
        let Some(repository) = self.store.get_repository(id).await.or_raise(|| ErrorKind::Store)? else {
            return Ok(None);
        };
        let latest = self.store.find_latest_release(id).await.or_raise(|| ErrorKind::Store)?;
        Ok(Some(RepositoryView::from((repository, latest))))
    }

    /// Start tracking `owner/name`.
    ///
    /// The upstream fetch completes before anything is written; the
    /// repository, its latest release and that release's (unseen) flag are
    /// then written in one transaction. An upstream failure therefore leaves
    /// no trace in the store.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn add_repository(&self, owner: &str, name: &str) -> Result<RepositoryView> {
        let url = repository_url(owner, name);
        let details = self.source.fetch_details(owner, name).await.map_err(ErrorKind::upstream)?;
        let tracked = self
            .store
            .track(owner, name, &url, details.description.as_deref(), details.latest_release.as_ref())
            .await
            .or_raise(|| ErrorKind::Store)?;
        let view = RepositoryView::from(tracked);
        tracing::info!(
            id = %view.id,
            version = view.latest_release.as_ref().map(|r| r.version.as_str()),
            "Tracking repository"
        );
        Ok(view)
    }

    /// Re-fetch `id` from upstream and reconcile its latest release.
    ///
    /// The description is overwritten unconditionally. A version already
    /// stored keeps its seen flag; a version never stored before is recorded
    /// as unseen. If upstream reports no release, nothing is deleted and the
    /// last known release is reported.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn refresh(&self, id: RepositoryId) -> Result<Refresh> {
        let repository = self
            .store
            .get_repository(id)
            .await
            .or_raise(|| ErrorKind::Store)?
            .ok_or_raise(|| ErrorKind::NotFound(id))?;
        let details = self
            .source
            .fetch_details(&repository.owner, &repository.name)
            .await
            .map_err(ErrorKind::upstream)?;
        let description = details.description;
        let updated = self
            .store
            .update_repository_description(id, description.as_deref())
            .await
            .or_raise(|| ErrorKind::Store)?;
        if !updated {
            // Removed while we were waiting on upstream.
            exn::bail!(ErrorKind::NotFound(id));
        }
        let (latest, change) = match details.latest_release {
            Some(info) => {
                let (release, change) = self.reconcile(id, &info).await?;
                (Some(release), change)
            },
            None => {
                tracing::warn!(%id, "Upstream reports no release; keeping last known release");
                let latest = self.store.find_latest_release(id).await.or_raise(|| ErrorKind::Store)?;
                (latest, ReleaseChange::Unpublished)
            },
        };
        let repository = reltrack_store::Repository { description, ..repository };
        Ok(Refresh {
            view: RepositoryView::from((repository, latest)),
            change,
        })
    }

    /// [`refresh()`](Self::refresh), reporting only the resulting view.
    pub async fn refresh_repository(&self, id: RepositoryId) -> Result<RepositoryView> {
        Ok(self.refresh(id).await?.view)
    }

    /// Decide whether `info` is a new release for the repository or one
    /// already stored.
    ///
    /// The read-before-insert check handles the common case. If a concurrent
    /// refresh records the same version between our read and our insert, the
    /// store's uniqueness constraint rejects the second insert and the row
    /// the other refresh wrote is reused.
    async fn reconcile(&self, id: RepositoryId, info: &ReleaseInfo) -> Result<(LatestRelease, ReleaseChange)> {
        if let Some(known) = self.known_release(id, info).await? {
            tracing::debug!(%id, version = %info.version, "Release already recorded");
            return Ok((known, ReleaseChange::Known));
        }
        match self.store.record_release(id, info).await {
            Ok(release) => {
                tracing::info!(%id, version = %info.version, release = %release.id, "New release recorded");
                Ok(((release, false), ReleaseChange::New))
            },
            Err(err) if matches!(&*err, StoreErrorKind::Constraint) => {
                tracing::warn!(%id, version = %info.version, "Release recorded concurrently; reusing it");
                let known = self.known_release(id, info).await?.ok_or_raise(|| ErrorKind::Store)?;
                Ok((known, ReleaseChange::Known))
            },
            Err(err) => Err(err.raise(ErrorKind::Store)),
        }
    }

    async fn known_release(&self, id: RepositoryId, info: &ReleaseInfo) -> Result<Option<LatestRelease>> {
        let Some(release) = self
            .store
            .find_release_by_version(id, &info.version)
            .await
            .or_raise(|| ErrorKind::Store)?
        else {
            return Ok(None);
        };
        let seen = self.store.get_seen_status(release.id).await.or_raise(|| ErrorKind::Store)?;
        Ok(Some((release, resolve_seen(seen))))
    }

    /// Toggle the seen flag of the repository's latest release.
    ///
    /// This is a toggle, not "set to seen": callers wanting a specific value
    /// must read the current one first. A release without a flag row counts as
    /// unseen, so its first toggle marks it seen. Returns `false` (not an
    /// error) when the repository is unknown or has no releases.
    #[instrument(skip(self))]
    pub async fn mark_as_seen(&self, id: RepositoryId) -> Result<bool> {
        let Some(release_id) = self.store.find_latest_release_id(id).await.or_raise(|| ErrorKind::Store)? else {
            tracing::debug!(%id, "No release to mark");
            return Ok(false);
        };
        let seen = self.store.toggle_seen_status(release_id).await.or_raise(|| ErrorKind::Store)?;
        tracing::info!(%id, release = %release_id, seen, "Toggled seen flag");
        Ok(true)
    }

    /// Stop tracking a repository, deleting its releases and seen flags.
    ///
    /// Returns the removed id, or `None` if it wasn't tracked; removing twice
    /// is safe.
    #[instrument(skip(self))]
    pub async fn remove_repository(&self, id: RepositoryId) -> Result<Option<RepositoryId>> {
        let removed = self.store.delete_repository(id).await.or_raise(|| ErrorKind::Store)?;
        if removed.is_some() {
            tracing::info!(%id, "Stopped tracking repository");
        }
        Ok(removed)
    }
}
