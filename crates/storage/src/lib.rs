//! Relational storage for users, books and loans on SQLite
//!
//! Provides:
//! - A pooled [`Database`] handle (`sqlite::memory:` or `sqlite://<path>`)
//! - Versioned schema migrations applied on connect
//! - Query modules per table: [`users`], [`books`], [`loans`]
//! - Write transactions that take the SQLite write lock up front

pub mod books;
pub mod error;
pub mod loans;
mod migrations;
pub mod users;

pub use error::{Result, StoreError};

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 8;

/// An open transaction. Dropping it without `commit` rolls back.
pub type Tx = Transaction<'static, Sqlite>;

/// Handle to the database. Cloning is cheap; every clone shares one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect using the default timeout
    ///
    /// # Arguments
    /// * `url` - `sqlite::memory:` or `sqlite://<path>`
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_timeout(url, DEFAULT_TIMEOUT).await
    }

    /// Connect, bounding every wait for a connection or a lock by `wait`
    pub async fn connect_with_timeout(url: &str, wait: Duration) -> Result<Self> {
        let options = parse_url(url)?.busy_timeout(wait);
        let pool_options = SqlitePoolOptions::new().acquire_timeout(wait);

        let pool = if is_in_memory(url) {
            // A memory database lives as long as its connection, so keep
            // exactly one open for the lifetime of the pool.
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            create_parent_dir(options.get_filename()).await?;
            pool_options
                .max_connections(MAX_CONNECTIONS)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        migrations::run(&pool).await?;
        tracing::debug!(url, "database connected");

        Ok(Self { pool })
    }

    /// A pooled connection for standalone reads and single-statement writes
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a write transaction. `BEGIN IMMEDIATE` takes the write lock at
    /// once, so check-then-write sequences inside it cannot interleave with
    /// another writer.
    pub async fn begin(&self) -> Result<Tx> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Start a read-only transaction: every query in it sees the same snapshot.
    pub async fn snapshot(&self) -> Result<Tx> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_url(url: &str) -> Result<SqliteConnectOptions> {
    if !url.starts_with("sqlite:") {
        return Err(StoreError::InvalidUrl(url.to_string()));
    }

    SqliteConnectOptions::from_str(url)
        .map(|options| options.create_if_missing(true))
        .map_err(|_| StoreError::InvalidUrl(url.to_string()))
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

async fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::{Role, User};
    use tempfile::TempDir;

    fn reader(email: &str) -> User {
        User::new("Reader".into(), email.into(), "hash".into(), Role::Reader)
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("sqlite::memory:").is_ok());
        assert!(parse_url("sqlite:///tmp/db.sqlite").is_ok());
        assert!(matches!(
            parse_url("mongodb://localhost:27017/test"),
            Err(StoreError::InvalidUrl(_))
        ));
        assert!(is_in_memory("sqlite::memory:"));
        assert!(!is_in_memory("sqlite://data/bookshelf.db"));
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let user = reader("a@example.com");

        let mut tx = db.begin().await.unwrap();
        users::insert(&mut tx, &user).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let found = users::find(&mut conn, &user.id).await.unwrap();
        assert_eq!(found.map(|u| u.email).as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_trace() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            users::insert(&mut tx, &reader("x@example.com")).await.unwrap();
            let err = users::insert(&mut tx, &reader("x@example.com")).await.unwrap_err();
            assert!(matches!(err, StoreError::DuplicateEmail(_)));
        }

        let mut conn = db.acquire().await.unwrap();
        assert!(users::find_by_email(&mut conn, "x@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_database_survives_reconnect() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("bookshelf.db");
        let url = format!("sqlite://{}", path.display());
        let user = reader("keep@example.com");

        let db = Database::connect(&url).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        users::insert(&mut tx, &user).await.unwrap();
        tx.commit().await.unwrap();
        db.close().await;

        let reopened = Database::connect(&url).await.unwrap();
        let mut conn = reopened.acquire().await.unwrap();
        assert!(users::exists(&mut conn, &user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_waits_are_bounded() {
        let db = Database::connect_with_timeout("sqlite::memory:", Duration::from_millis(50))
            .await
            .unwrap();

        let _held = db.acquire().await.unwrap();
        let result = db.acquire().await;

        assert!(matches!(
            result,
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        ));
    }
}
