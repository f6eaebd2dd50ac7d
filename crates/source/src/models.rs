use time::OffsetDateTime;

/// A single upstream release, normalized away from any provider's wire format.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseInfo {
    /// Upstream tag or identifier; the natural key of a release within a
    /// repository.
    pub version: String,
    pub release_date: Option<OffsetDateTime>,
    pub release_notes: Option<String>,
}
impl ReleaseInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_date: None,
            release_notes: None,
        }
    }

    pub fn with_date(mut self, date: OffsetDateTime) -> Self {
        self.release_date = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.release_notes = Some(notes.into());
        self
    }
}

/// Everything the tracker needs from upstream in one round trip.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RepositoryDetails {
    pub description: Option<String>,
    /// `None` when the repository exists but has not published a release.
    pub latest_release: Option<ReleaseInfo>,
}
