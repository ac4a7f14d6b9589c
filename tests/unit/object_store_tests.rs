/*!
 * Tests for the object store implementations
 */

use bytes::Bytes;
use ocrpipe::collaborators::{content_etag, FsObjectStore, InMemoryObjectStore, ObjectStore};
use ocrpipe::errors::StoreError;
use crate::common;

#[tokio::test]
async fn test_fsStore_overwrite_shouldKeepLatestContent() {
    let dir = common::create_temp_dir().unwrap();
    let store = FsObjectStore::new(dir.path());

    store.write("translated-text", "menu_to_fr.txt", Bytes::from("v1")).await.unwrap();
    let receipt = store.write("translated-text", "menu_to_fr.txt", Bytes::from("v2")).await.unwrap();

    assert_eq!(receipt.etag, content_etag(b"v2"));
    assert_eq!(store.read("translated-text", "menu_to_fr.txt").await.unwrap(), Bytes::from("v2"));

    // Only the final object remains, no temporary files
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("translated-text")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_fsStore_withEscapingKey_shouldRejectKey() {
    let dir = common::create_temp_dir().unwrap();
    let store = FsObjectStore::new(dir.path());

    let result = store.write("out", "../outside.txt", Bytes::from("x")).await;
    assert!(matches!(result, Err(StoreError::InvalidKey { .. })));

    let result = store.read("../etc", "passwd").await;
    assert!(matches!(result, Err(StoreError::InvalidKey { .. })));
}

#[tokio::test]
async fn test_fsStore_readMissing_shouldBeNotFound() {
    let dir = common::create_temp_dir().unwrap();
    let store = FsObjectStore::new(dir.path());

    assert!(!store.exists("out", "nothing.txt").await.unwrap());
    assert!(matches!(
        store.read("out", "nothing.txt").await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_memoryStore_write_shouldBumpGeneration() {
    let store = InMemoryObjectStore::new();

    let first = store.write("out", "a_to_de.txt", Bytes::from("eins")).await.unwrap();
    let second = store.write("out", "a_to_de.txt", Bytes::from("zwei")).await.unwrap();

    assert_eq!(first.generation + 1, second.generation);
    assert_eq!(store.get_text("out", "a_to_de.txt").unwrap(), "zwei");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_memoryStore_withFailingBucket_shouldRejectWrites() {
    let store = InMemoryObjectStore::new();
    store.fail_writes_to("out");

    assert!(store.write("out", "a.txt", Bytes::from("x")).await.is_err());

    store.restore_writes_to("out");
    tokio_test::assert_ok!(store.write("out", "a.txt", Bytes::from("x")).await);
    assert!(store.exists("out", "a.txt").await.unwrap());
}
