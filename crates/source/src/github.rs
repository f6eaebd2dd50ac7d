//! GitHub REST API provider.

use crate::ReleaseSource;
use crate::error::{ErrorKind, Result};
use crate::models::{ReleaseInfo, RepositoryDetails};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: String,
    published_at: Option<String>,
    body: Option<String>,
}
impl From<ReleasePayload> for ReleaseInfo {
    fn from(payload: ReleasePayload) -> Self {
        let release_date = payload.published_at.as_deref().and_then(|date| match OffsetDateTime::parse(date, &Rfc3339) {
            Ok(date) => Some(date),
            Err(err) => {
                tracing::debug!(tag = %payload.tag_name, date, %err, "Ignoring unparsable release date");
                None
            },
        });
        Self {
            version: payload.tag_name,
            release_date,
            release_notes: payload.body,
        }
    }
}

/// What a non-success status code means for a request.
#[derive(Debug, Eq, PartialEq)]
enum Failure {
    /// The requested resource does not exist.
    Missing,
    /// Worth retrying later.
    Unavailable,
    /// Anything else; retrying won't help.
    Rejected,
}
impl From<StatusCode> for Failure {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::Missing,
            // GitHub answers 403 (not only 429) when a rate limit is exhausted.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Self::Unavailable,
            s if s.is_server_error() => Self::Unavailable,
            _ => Self::Rejected,
        }
    }
}

/// Release provider backed by the GitHub REST API.
///
/// Issues `GET /repos/{owner}/{repo}` and `GET /repos/{owner}/{repo}/releases/latest`
/// concurrently. A missing latest release (404 on the second call) is
/// reported as `None`, while a missing repository (404 on the first call)
/// fails with [`ErrorKind::NotFound`].
#[derive(Clone)]
pub struct GitHubSource {
    client: Client,
    api_url: String,
    token: Option<String>,
}
impl fmt::Debug for GitHubSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSource")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
impl GitHubSource {
    /// Create a provider talking to `api_url` (usually [`DEFAULT_API_URL`]).
    ///
    /// GitHub rejects requests without a `User-Agent`, so one is required.
    pub fn new(api_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Authenticate requests with a bearer token (raises the rate limit and
    /// grants access to private repositories).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode its JSON body; `Ok(None)` on 404.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>> {
        let response = self
            .request(path)
            .send()
            .await
            .or_raise(|| ErrorKind::Unavailable(format!("request to {path} failed")))?;
        let status = response.status();
        if !status.is_success() {
            match Failure::from(status) {
                Failure::Missing => return Ok(None),
                Failure::Unavailable => exn::bail!(ErrorKind::Unavailable(format!("{path} returned {status}"))),
                Failure::Rejected => exn::bail!(ErrorKind::InvalidResponse),
            }
        }
        let body = response.json::<T>().await.or_raise(|| ErrorKind::InvalidResponse)?;
        Ok(Some(body))
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryPayload> {
        let path = format!("/repos/{owner}/{name}");
        let Some(repository) = self.get_json::<RepositoryPayload>(&path).await? else {
            exn::bail!(ErrorKind::NotFound(format!("{owner}/{name}")));
        };
        Ok(repository)
    }

    async fn get_latest_release(&self, owner: &str, name: &str) -> Result<Option<ReleaseInfo>> {
        let path = format!("/repos/{owner}/{name}/releases/latest");
        Ok(self.get_json::<ReleasePayload>(&path).await?.map(ReleaseInfo::from))
    }
}

#[async_trait]
impl ReleaseSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    #[instrument(skip(self))]
    async fn fetch_details(&self, owner: &str, name: &str) -> Result<RepositoryDetails> {
        let (repository, latest_release) =
            tokio::join!(self.get_repository(owner, name), self.get_latest_release(owner, name));
        combine(repository, latest_release)
    }
}

/// Merge the two concurrent lookups.
///
/// The repository result is checked first: a missing repository must surface
/// as `NotFound` even when the release lookup failed in some other way.
fn combine(repository: Result<RepositoryPayload>, latest_release: Result<Option<ReleaseInfo>>) -> Result<RepositoryDetails> {
    let repository = repository?;
    Ok(RepositoryDetails {
        description: repository.description,
        latest_release: latest_release?,
    })
}
