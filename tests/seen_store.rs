//! Integration tests for the on-disk seen store.
//!
//! Each test uses its own SQLite file under the system temp dir so that
//! reopening and persistence can be checked.

use dealwatch::storage::{SeenStore, StoreError, DEFAULT_RETENTION};
use std::path::PathBuf;

fn temp_db(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dealwatch_store_test_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("seen.db")
}

#[tokio::test]
async fn test_open_creates_file() {
    let path = temp_db("create");
    assert!(!path.exists());

    let store = SeenStore::open(path.to_str().unwrap()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(path.exists());
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let path = temp_db("reopen");
    let path_str = path.to_str().unwrap();

    {
        let store = SeenStore::open(path_str).await.unwrap();
        store.record("https://example.com/node/1").await.unwrap();
        store.record("https://example.com/node/2").await.unwrap();
    }

    // Opening again is idempotent and keeps existing records
    let store = SeenStore::open(path_str).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
    assert!(store.has_seen("https://example.com/node/1").await.unwrap());
    assert!(!store.has_seen("https://example.com/node/3").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_record_rejected_after_reopen() {
    let path = temp_db("duplicate");
    let path_str = path.to_str().unwrap();

    SeenStore::open(path_str)
        .await
        .unwrap()
        .record("https://example.com/node/9")
        .await
        .unwrap();

    let store = SeenStore::open(path_str).await.unwrap();
    let err = store.record("https://example.com/node/9").await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

#[tokio::test]
async fn test_purge_with_real_clock_keeps_fresh_records() {
    let path = temp_db("purge");
    let store = SeenStore::open(path.to_str().unwrap()).await.unwrap();

    let now = chrono::Utc::now().timestamp();
    store
        .record_at("https://example.com/node/ancient", now - 60 * 86_400)
        .await
        .unwrap();
    store.record("https://example.com/node/today").await.unwrap();

    let removed = store.purge_older_than(DEFAULT_RETENTION).await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.has_seen("https://example.com/node/today").await.unwrap());
}

#[tokio::test]
async fn test_open_in_missing_directory_is_unavailable() {
    let path = std::env::temp_dir()
        .join("dealwatch_store_test_missing_parent")
        .join("does")
        .join("not")
        .join("exist.db");

    let result = SeenStore::open(path.to_str().unwrap()).await;
    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}
