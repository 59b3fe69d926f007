use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    /// Another newsdesk process holds the database lock.
    #[error("Another newsdesk command appears to be running. Please wait and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Stored {what} could not be encoded: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let message = err.to_string().to_lowercase();
        if message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("unable to open database file")
        {
            return StorageError::InstanceLocked;
        }
        StorageError::Other(err)
    }
}

// ============================================================================
// Database
// ============================================================================

/// Local store for the session and the preview draft.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database for tests. On unix the
    /// file is created with mode 0600 since it holds the bearer token.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                if let Err(e) = std::fs::set_permissions(db_path, std::fs::Permissions::from_mode(0o600)) {
                    tracing::warn!(path = %path, error = %e, "Failed to restrict database file permissions");
                }
            } else if db_path.parent().is_some_and(|p| p.exists()) {
                // Create with 0600 up front; a failure here resurfaces from connect_with.
                let _ = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path);
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // One CLI command at a time; in-memory databases must stay on a single
        // connection or each connection sees its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| match StorageError::from_sqlx(e) {
            StorageError::Other(e) => StorageError::Migration(e.to_string()),
            locked => locked,
        })?;
        tracing::debug!(path = %path, "Opened local store");
        Ok(db)
    }

    /// Create tables inside one transaction. Idempotent.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Single-row tables: the CHECK pins the only valid id to 1.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                token TEXT NOT NULL,
                user_json TEXT NOT NULL,
                saved_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preview_draft (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                draft_json TEXT NOT NULL,
                saved_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
