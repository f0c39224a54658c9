use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Seen-store errors.
///
/// `Query` and `Write` are surfaced to the poll loop, which aborts the cycle
/// rather than risk a duplicate notification. Purge failures use the same
/// variants but are only logged by the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be opened, created or migrated
    #[error("Seen store unavailable: {0}")]
    Unavailable(String),

    /// Reading a record failed
    #[error("Seen store query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Inserting or deleting records failed
    #[error("Seen store write failed: {0}")]
    Write(#[source] sqlx::Error),

    /// The url already has a record (primary key violation)
    #[error("Entry already recorded: {0}")]
    Duplicate(String),
}

impl StoreError {
    /// Classify an insert failure, splitting out primary-key violations.
    pub(crate) fn from_insert(err: sqlx::Error, url: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(url.to_string());
            }
        }
        StoreError::Write(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Durable fact that a url has already been processed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SeenRecord {
    pub url: String,
    /// Seconds since the Unix epoch
    pub first_seen_at: i64,
}
