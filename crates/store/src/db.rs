//! SQLite pool setup for the release store.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::Store;
use crate::error::{ErrorKind, Result};

/// Schema for repositories, releases and seen flags, applied on every connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Tracker operations run concurrently across repositories, but SQLite only
// ever has one writer. A handful of readers is plenty.
const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_millis(2500);

/// Database connection pool for the release store.
///
/// The pool is the one shared resource between concurrent tracker
/// operations. It is cheap to clone and is handed explicitly to every
/// [`Store`] rather than living in a global.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the release database at `path` and bring its
    /// schema up to date. The parent directory must already exist.
    ///
    /// `max_connections` defaults to a pool of five.
    pub async fn connect(path: impl AsRef<Path>, max_connections: Option<u32>) -> Result<Self> {
        let options = Self::options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, max_connections.unwrap_or(MAX_CONNECTIONS)).await
    }

    /// Open a throwaway database that lives only as long as its one connection.
    ///
    /// Deliberately available outside `#[cfg(test)]`: the tracker's tests run
    /// against it.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to ":memory:" gets its own empty database.
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Cascading deletes from repositories to releases to seen_status.
            .foreign_keys(true)
            // Concurrent refreshes and toggles wait for the writer lock.
            .busy_timeout(BUSY_TIMEOUT)
    }

    #[instrument("migrating release database", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A [`Store`] sharing this database's connection pool.
    pub fn store(&self) -> Store {
        Store::from(self)
    }

    /// Let SQLite refresh its query planner statistics, then wait for every
    /// connection to come back and close the pool.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
