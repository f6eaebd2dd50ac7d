//! In-memory release provider for testing.

use crate::ReleaseSource;
use crate::error::{ErrorKind, Result};
use crate::models::{ReleaseInfo, RepositoryDetails};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

type Key = (String, String);

fn key(owner: &str, name: &str) -> Key {
    (owner.to_string(), name.to_string())
}

/// In-memory release provider for testing.
///
/// Repositories live in a `HashMap` behind a [`RwLock`], so tests can publish
/// new releases between tracker calls while the provider is shared behind an
/// `Arc`. Ideal for exercising refresh reconciliation without network access.
///
/// # Examples
///
/// ```
/// use reltrack_source::{MockSource, ReleaseInfo, ReleaseSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MockSource::default().with_repository("acme", "widget", Some("Widgets"));
/// assert!(source.fetch_latest("acme", "widget").await.unwrap().is_none());
///
/// source.publish("acme", "widget", ReleaseInfo::new("v1.0.0")).await;
/// let latest = source.fetch_latest("acme", "widget").await.unwrap();
/// assert_eq!(latest.unwrap().version, "v1.0.0");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    repositories: RwLock<HashMap<Key, RepositoryDetails>>,
    unavailable: RwLock<bool>,
}

impl MockSource {
    /// Register a repository with no published releases.
    pub fn with_repository(mut self, owner: &str, name: &str, description: Option<&str>) -> Self {
        let details = RepositoryDetails {
            description: description.map(str::to_string),
            latest_release: None,
        };
        self.repositories.get_mut().insert(key(owner, name), details);
        self
    }

    /// Make `release` the latest release of a registered repository.
    ///
    /// Panics if the repository was never registered. If test setup is
    /// wrong, then test should not pass.
    pub async fn publish(&self, owner: &str, name: &str, release: ReleaseInfo) {
        let mut guard = self.repositories.write().await;
        let Some(details) = guard.get_mut(&key(owner, name)) else {
            panic!("MockSource::publish: unknown repository {owner}/{name}");
        };
        details.latest_release = Some(release);
    }

    /// Withdraw the latest release, so the repository reports none.
    pub async fn unpublish(&self, owner: &str, name: &str) {
        if let Some(details) = self.repositories.write().await.get_mut(&key(owner, name)) {
            details.latest_release = None;
        }
    }

    pub async fn set_description(&self, owner: &str, name: &str, description: Option<&str>) {
        if let Some(details) = self.repositories.write().await.get_mut(&key(owner, name)) {
            details.description = description.map(str::to_string);
        }
    }

    /// Delete the repository upstream, so it fails with `NotFound`.
    pub async fn remove(&self, owner: &str, name: &str) {
        self.repositories.write().await.remove(&key(owner, name));
    }

    /// Simulate a provider outage: every fetch fails with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }
}

#[async_trait]
impl ReleaseSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_details(&self, owner: &str, name: &str) -> Result<RepositoryDetails> {
        if *self.unavailable.read().await {
            exn::bail!(ErrorKind::Unavailable("mock outage".to_string()));
        }
        let guard = self.repositories.read().await;
        let details = guard
            .get(&key(owner, name))
            .cloned()
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(format!("{owner}/{name}"))))?;
        Ok(details)
    }
}
