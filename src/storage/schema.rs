use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;

// ============================================================================
// Seen Store
// ============================================================================

/// SQLite-backed record of every listing url already processed.
///
/// There is exactly one writer (the poll loop), so the pool holds a single
/// connection. That also keeps `:memory:` databases coherent across calls.
#[derive(Clone)]
pub struct SeenStore {
    pub(crate) pool: SqlitePool,
}

impl SeenStore {
    /// Open (creating if absent) the store at `path` and ensure the schema.
    ///
    /// Idempotent: opening an existing store leaves its records untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the file cannot be opened,
    /// created, or migrated.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Keep the file private to the running user, as it reveals what was posted where.
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // If creation fails, SQLite will report the error at connect_with.
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store
            .migrate()
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;

        tracing::debug!(path = %path, "Seen store ready");
        Ok(store)
    }

    /// Create the schema inside a single transaction.
    ///
    /// Every statement uses `IF NOT EXISTS`, so re-running on an existing
    /// store is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_entries (
                url TEXT PRIMARY KEY NOT NULL,
                first_seen_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Retention purge filters on age
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_seen_entries_first_seen ON seen_entries(first_seen_at)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
