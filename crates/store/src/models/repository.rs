use crate::models::RepositoryId;

/// A repository the user has asked to track.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Repository {
    pub id: RepositoryId,
    pub owner: String,
    pub name: String,
    /// Derived from `owner`/`name` when the repository was added.
    pub url: String,
    pub description: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct RepositoryRow {
    pub(crate) id: i64,
    pub(crate) owner: String,
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) description: Option<String>,
}
impl From<RepositoryRow> for Repository {
    fn from(row: RepositoryRow) -> Self {
        Self {
            id: RepositoryId::from(row.id),
            owner: row.owner,
            name: row.name,
            url: row.url,
            description: row.description,
        }
    }
}
