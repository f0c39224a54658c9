use std::time::Duration;

use super::schema::SeenStore;
use super::types::{SeenRecord, StoreError};

/// Default retention window for seen records (30 days)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

impl SeenStore {
    // ========================================================================
    // Seen Entry Operations
    // ========================================================================

    /// Whether a record exists for `url`.
    pub async fn has_seen(&self, url: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM seen_entries WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Query)?;

        Ok(row.is_some())
    }

    /// Record `url` as seen now.
    pub async fn record(&self, url: &str) -> Result<(), StoreError> {
        self.record_at(url, chrono::Utc::now().timestamp()).await
    }

    /// Record `url` as first seen at `first_seen_at` (epoch seconds).
    ///
    /// Records are never updated in place: a second insert for the same url
    /// fails with [`StoreError::Duplicate`].
    pub async fn record_at(&self, url: &str, first_seen_at: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO seen_entries (url, first_seen_at) VALUES (?, ?)")
            .bind(url)
            .bind(first_seen_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, url))?;

        Ok(())
    }

    /// Delete records older than `retention`, measured from now.
    ///
    /// Returns the number of records removed.
    pub async fn purge_older_than(&self, retention: Duration) -> Result<u64, StoreError> {
        self.purge_older_than_at(retention, chrono::Utc::now().timestamp())
            .await
    }

    /// Delete records whose `first_seen_at` predates `now - retention`.
    pub async fn purge_older_than_at(
        &self,
        retention: Duration,
        now: i64,
    ) -> Result<u64, StoreError> {
        let retention_secs = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(retention_secs);

        let result = sqlx::query("DELETE FROM seen_entries WHERE first_seen_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Write)?;

        Ok(result.rows_affected())
    }

    /// Fetch the record for `url`, if any.
    pub async fn get(&self, url: &str) -> Result<Option<SeenRecord>, StoreError> {
        sqlx::query_as::<_, SeenRecord>(
            "SELECT url, first_seen_at FROM seen_entries WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Query)
    }

    /// Number of records currently held.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seen_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Query)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SeenStore {
        SeenStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_unrecorded_url_is_unseen() {
        let store = test_store().await;
        assert!(!store.has_seen("https://example.com/node/1").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_then_has_seen() {
        let store = test_store().await;
        store.record("https://example.com/node/1").await.unwrap();

        assert!(store.has_seen("https://example.com/node/1").await.unwrap());
        assert!(!store.has_seen("https://example.com/node/2").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_twice_is_duplicate() {
        let store = test_store().await;
        store.record_at("https://example.com/node/1", 100).await.unwrap();

        let err = store
            .record_at("https://example.com/node/1", 200)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref url) if url == "https://example.com/node/1"));

        // Never updated in place
        let record = store.get("https://example.com/node/1").await.unwrap().unwrap();
        assert_eq!(record.first_seen_at, 100);
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let store = test_store().await;
        let now = 1_700_000_000;
        let day = 24 * 60 * 60;

        store.record_at("https://example.com/node/old", now - 31 * day).await.unwrap();
        store.record_at("https://example.com/node/new", now - 29 * day).await.unwrap();

        let removed = store.purge_older_than_at(DEFAULT_RETENTION, now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!store.has_seen("https://example.com/node/old").await.unwrap());
        assert!(store.has_seen("https://example.com/node/new").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_keeps_record_exactly_at_cutoff() {
        let store = test_store().await;
        let now = 1_700_000_000;
        let cutoff = now - DEFAULT_RETENTION.as_secs() as i64;

        store.record_at("https://example.com/node/edge", cutoff).await.unwrap();

        let removed = store.purge_older_than_at(DEFAULT_RETENTION, now).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_on_empty_store() {
        let store = test_store().await;
        assert_eq!(store.purge_older_than(DEFAULT_RETENTION).await.unwrap(), 0);
    }
}
