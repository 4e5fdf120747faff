//! SQLite session backend.
//!
//! Same schema as the remote table, for local runs and tests.

use async_trait::async_trait;
use atende_core::{error::AtendeError, shellexpand, traits::SessionBackend};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Session table in a local SQLite database.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    table: String,
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub(crate) fn check_table_name(table: &str) -> Result<(), AtendeError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AtendeError::Config(format!("invalid session table name '{table}'")))
    }
}

impl SqliteBackend {
    /// Open (creating if needed) the database file and ensure the table exists.
    pub async fn open(db_path: &str, table: &str) -> Result<Self, AtendeError> {
        check_table_name(table)?;
        let db_path = shellexpand(db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AtendeError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AtendeError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| AtendeError::Store(format!("failed to connect to sqlite: {e}")))?;

        let backend = Self::from_pool(pool, table).await?;
        info!("SQLite session store initialized at {db_path}");
        Ok(backend)
    }

    /// Wrap an existing pool, creating the table if it is missing.
    pub async fn from_pool(pool: SqlitePool, table: &str) -> Result<Self, AtendeError> {
        check_table_name(table)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                session_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"
        );
        sqlx::query(&ddl)
            .execute(&pool)
            .await
            .map_err(|e| AtendeError::Store(format!("failed to create {table}: {e}")))?;

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// `(created_at, updated_at)` for a key, for inspecting overwrite behavior.
    pub async fn timestamps(&self, key: &str) -> Result<Option<(String, String)>, AtendeError> {
        let sql = format!(
            "SELECT created_at, updated_at FROM {} WHERE id = ?",
            self.table
        );
        sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AtendeError::Store(format!("select failed: {e}")))
    }
}

#[async_trait]
impl SessionBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, AtendeError> {
        let sql = format!("SELECT session_data FROM {} WHERE id = ?", self.table);
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AtendeError::Store(format!("select failed: {e}")))?;
        Ok(row.map(|(data,)| data))
    }

    async fn upsert(&self, key: &str, blob: &str) -> Result<(), AtendeError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let sql = format!(
            "INSERT INTO {} (id, session_data, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                session_data = excluded.session_data,
                updated_at = excluded.updated_at",
            self.table
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(blob)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| AtendeError::Store(format!("upsert failed: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AtendeError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table);
        sqlx::query(&sql)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| AtendeError::Store(format!("delete failed: {e}")))?;
        Ok(())
    }

    async fn has_rows(&self) -> Result<bool, AtendeError> {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", self.table);
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AtendeError::Store(format!("select failed: {e}")))?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory backend for tests.
    pub(crate) async fn memory_backend() -> SqliteBackend {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .unwrap();
        SqliteBackend::from_pool(pool, "whatsapp_sessions")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_missing_is_none() {
        let backend = memory_backend().await;
        assert_eq!(backend.fetch("default_session").await.unwrap(), None);
        assert!(!backend.has_rows().await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_then_fetch() {
        let backend = memory_backend().await;
        backend.upsert("default_session", "{\"a\":1}").await.unwrap();
        assert_eq!(
            backend.fetch("default_session").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(backend.has_rows().await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_keeps_created_at() {
        let backend = memory_backend().await;
        backend.upsert("default_session", "first").await.unwrap();
        let (created, _) = backend.timestamps("default_session").await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        backend.upsert("default_session", "second").await.unwrap();

        let (created_after, updated_after) =
            backend.timestamps("default_session").await.unwrap().unwrap();
        assert_eq!(created, created_after);
        assert!(updated_after > created_after);
        assert_eq!(
            backend.fetch("default_session").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let backend = memory_backend().await;
        backend.upsert("bot-a", "a").await.unwrap();
        backend.upsert("bot-b", "b").await.unwrap();
        backend.delete("bot-a").await.unwrap();
        assert_eq!(backend.fetch("bot-a").await.unwrap(), None);
        assert_eq!(backend.fetch("bot-b").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let backend = memory_backend().await;
        assert!(backend.delete("nope").await.is_ok());
    }

    #[test]
    fn test_table_name_check() {
        assert!(check_table_name("whatsapp_sessions").is_ok());
        assert!(check_table_name("sessions2").is_ok());
        assert!(check_table_name("").is_err());
        assert!(check_table_name("2sessions").is_err());
        assert!(check_table_name("sessions; DROP TABLE x").is_err());
        assert!(check_table_name("public.sessions").is_err());
    }
}
