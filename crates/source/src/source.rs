use crate::error::Result;
use crate::models::{ReleaseInfo, RepositoryDetails};
use async_trait::async_trait;

/// Read-only access to an upstream release provider.
///
/// # Contract
/// - A repository that exists but has published no releases yields
///   `latest_release: None`, never an error.
/// - A repository that does not exist fails with
///   [`NotFound`](crate::error::ErrorKind::NotFound).
/// - Implementations must not retry internally.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Name of the provider (used for logging only).
    fn name(&self) -> &str;

    /// Fetch the description and latest release of `owner/name`.
    async fn fetch_details(&self, owner: &str, name: &str) -> Result<RepositoryDetails>;

    /// Fetch only the latest release of `owner/name`.
    ///
    /// Default implementation discards the description from
    /// [`fetch_details()`](Self::fetch_details), which is also how the
    /// "no releases" and "no repository" cases are told apart.
    async fn fetch_latest(&self, owner: &str, name: &str) -> Result<Option<ReleaseInfo>> {
        Ok(self.fetch_details(owner, name).await?.latest_release)
    }
}
