//! src/services/snippet_store.rs
//!
//! SnippetStore — durable id → snippet mapping backed by SQLite. It is the
//! only component that talks to the database and exposes exactly two data
//! operations: `insert` and `get_by_id`. There is no update or
//! delete path; published snippets are immutable.

use crate::models::{
    snippet::{NewSnippet, Snippet},
    snippet_id::SnippetId,
};
use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{io, path::Path, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info};

/// Schema applied on every startup. Every statement must be idempotent.
const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snippet `{0}` already exists")]
    DuplicateKey(SnippetId),
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Connection settings for [`SnippetStore::open`].
#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl StoreOptions {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to the snippet database.
///
/// Opened once at startup and cloned into the router state; all clones share
/// one connection pool. Call [`SnippetStore::close`] on shutdown.
#[derive(Clone)]
pub struct SnippetStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SnippetStore {
    /// Wrap an existing pool. The schema is not touched.
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Open (creating if needed) the SQLite database described by `opts`.
    ///
    /// The parent directory of a file-backed database is created first. The
    /// schema is not applied; call [`SnippetStore::migrate`] afterwards.
    pub async fn open(opts: &StoreOptions) -> StoreResult<Self> {
        if let Some(parent) = sqlite_file_path(&opts.database_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
                info!(dir = %parent.display(), "created database directory");
            }
        }

        let connect = SqliteConnectOptions::from_str(&opts.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(opts.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(opts.max_connections)
            .connect_with(connect)
            .await?;

        debug!(url = %opts.database_url, "opened snippet database");
        Ok(Self::new(Arc::new(pool)))
    }

    /// Create the `snippets` table if it does not exist yet.
    ///
    /// Safe to run on every startup; existing rows are never touched.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = INIT_MIGRATION
            .split(';')
            .map(strip_sql_comments)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(&stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Insert a new snippet and return the stored row.
    ///
    /// Uniqueness is enforced by the primary key inside a single `INSERT`,
    /// so two racing publishes of the same id cannot both succeed. A
    /// collision yields [`StoreError::DuplicateKey`]; the existing row is
    /// left untouched.
    pub async fn insert(&self, snippet: &NewSnippet) -> StoreResult<Snippet> {
        let result = sqlx::query_as::<_, Snippet>(
            r#"
            INSERT INTO snippets (id, title, code, language, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, code, language, created_at
            "#,
        )
        .bind(&snippet.id)
        .bind(&snippet.title)
        .bind(&snippet.code)
        .bind(&snippet.language)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateKey(snippet.id.clone()))
            }
            Err(err) => Err(StoreError::Unavailable(err)),
        }
    }

    /// Fetch a snippet by id. `Ok(None)` means it was never published.
    pub async fn get_by_id(&self, id: &SnippetId) -> StoreResult<Option<Snippet>> {
        let row = sqlx::query_as::<_, Snippet>(
            "SELECT id, title, code, language, created_at FROM snippets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Lightweight connectivity check used by the readiness endpoint.
    pub async fn ping(&self) -> StoreResult<()> {
        let value = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        debug!(value, "sqlite ping");
        Ok(())
    }

    /// Close every pooled connection. Later queries fail with
    /// [`StoreError::Unavailable`].
    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Return true if the SQLx error is a primary key / unique constraint hit.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation()
                || db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Extract the on-disk path from a `sqlite:` URL, or `None` for in-memory
/// databases.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" || path.starts_with("file::memory:") {
        None
    } else {
        Some(Path::new(path.trim_start_matches("file:")))
    }
}

fn strip_sql_comments(stmt: &str) -> String {
    stmt.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::snippet::{DEFAULT_LANGUAGE, DEFAULT_TITLE};
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SnippetStore {
        let url = format!("sqlite://{}", dir.path().join("snippets.db").display());
        let store = SnippetStore::open(&StoreOptions::new(url)).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn candidate(id: &str, code: &str) -> NewSnippet {
        NewSnippet::new(
            SnippetId::parse(id).unwrap(),
            None,
            code.to_string(),
            Some("html".into()),
        )
    }

    #[tokio::test]
    async fn insert_then_get_returns_the_same_record() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let stored = store.insert(&candidate("abc123", "<p>hi</p>")).await.unwrap();
        assert_eq!(stored.id.as_str(), "abc123");
        assert_eq!(stored.title, DEFAULT_TITLE);

        let fetched = store.get_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.code, "<p>hi</p>");
        assert_eq!(fetched.language, "html");
    }

    #[tokio::test]
    async fn get_on_empty_store_is_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let missing = SnippetId::parse("nothing-here").unwrap();
        assert!(store.get_by_id(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_fails_and_keeps_first_row() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.insert(&candidate("dup", "first")).await.unwrap();
        let err = store.insert(&candidate("dup", "second")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(ref id) if id.as_str() == "dup"));

        let fetched = store
            .get_by_id(&SnippetId::parse("dup").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.code, "first");
    }

    #[tokio::test]
    async fn concurrent_inserts_of_one_id_yield_exactly_one_row() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let first = candidate("race", "from-a");
        let second = candidate("race", "from-b");
        let (a, b) = tokio::join!(store.insert(&first), store.insert(&second));
        let results = [a, b];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let dups = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateKey(_))))
            .count();
        assert_eq!((wins, dups), (1, 1));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snippets")
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        let stored = store.get_by_id(&winner.id).await.unwrap().unwrap();
        assert_eq!(stored.code, winner.code);
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store.migrate().await.unwrap();
            store.insert(&candidate("keep", "persisted")).await.unwrap();
            store.close().await;
        }

        let reopened = open_store(&dir).await;
        let fetched = reopened
            .get_by_id(&SnippetId::parse("keep").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.code, "persisted");
    }

    #[tokio::test]
    async fn queries_after_close_report_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.close().await;

        let err = store
            .insert(&NewSnippet::new(
                SnippetId::generate(),
                None,
                "x".into(),
                None,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("meta").join("snippets.db");
        let url = format!("sqlite://{}", nested.display());
        let store = SnippetStore::open(&StoreOptions::new(url)).await.unwrap();
        store.migrate().await.unwrap();
        assert!(nested.exists());

        let stored = store
            .insert(&NewSnippet::new(SnippetId::generate(), None, "y".into(), None))
            .await
            .unwrap();
        assert_eq!(stored.language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn sqlite_file_path_handles_url_shapes() {
        assert_eq!(
            sqlite_file_path("sqlite://./data/snippets.db"),
            Some(Path::new("./data/snippets.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:/tmp/x.db?mode=rwc"),
            Some(Path::new("/tmp/x.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
    }

    #[test]
    fn migration_statements_are_stripped_of_comments() {
        let stmt = strip_sql_comments("-- header\nCREATE TABLE t (x INT)\n");
        assert_eq!(stmt, "CREATE TABLE t (x INT)");
    }
}
