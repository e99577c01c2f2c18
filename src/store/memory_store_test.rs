use super::*;
use crate::Error;
use crate::WatchError;

const PATH: &str = "/casbin";

#[tokio::test]
async fn test_get_missing_path_is_read_error() {
    let store = MemoryStore::new();
    assert!(matches!(store.get(PATH).await.unwrap_err(), Error::Read { .. }));
}

#[tokio::test]
async fn test_insert_then_get() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let value = store.get(PATH).await.unwrap();
    assert_eq!(value.data, b"0");
    assert_eq!(value.version, Version(0));
}

#[tokio::test]
async fn test_overwrite_bumps_version() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");
    store.insert(PATH, "5");

    let value = store.get(PATH).await.unwrap();
    assert_eq!(value.data, b"5");
    assert_eq!(value.version, Version(1));
}

#[tokio::test]
async fn test_cas_with_observed_stamp_succeeds() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let current = store.get(PATH).await.unwrap();
    let new_version = store
        .compare_and_set(PATH, b"1".to_vec(), current.version)
        .await
        .unwrap();

    assert_eq!(new_version, Version(1));
    let value = store.get(PATH).await.unwrap();
    assert_eq!(value.data, b"1");
    assert_eq!(value.version, new_version);
}

#[tokio::test]
async fn test_cas_with_stale_stamp_conflicts_and_leaves_store_unchanged() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");
    let stale = store.get(PATH).await.unwrap().version;

    store.compare_and_set(PATH, b"1".to_vec(), stale).await.unwrap();

    let e = store.compare_and_set(PATH, b"2".to_vec(), stale).await.unwrap_err();
    assert!(e.is_cas_conflict());

    let value = store.get(PATH).await.unwrap();
    assert_eq!(value.data, b"1");
    assert_eq!(value.version, Version(1));
}

#[tokio::test]
async fn test_cas_on_missing_path_is_write_error() {
    let store = MemoryStore::new();
    let e = store.compare_and_set(PATH, b"1".to_vec(), Version(0)).await.unwrap_err();
    assert!(matches!(e, Error::Write { .. }));
}

#[tokio::test]
async fn test_get_and_watch_returns_current_value() {
    let store = MemoryStore::new();
    store.insert(PATH, "7");

    let (value, _signal) = store.get_and_watch(PATH).await.unwrap();
    assert_eq!(value.data, b"7");
    assert_eq!(value.version, Version(0));
}

#[tokio::test]
async fn test_watch_fires_on_insert() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let (_, signal) = store.get_and_watch(PATH).await.unwrap();
    store.insert(PATH, "1");

    assert_eq!(signal.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_watch_fires_on_cas() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let (current, signal) = store.get_and_watch(PATH).await.unwrap();
    store.compare_and_set(PATH, b"1".to_vec(), current.version).await.unwrap();

    assert_eq!(signal.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_watch_is_one_shot() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let (_, signal) = store.get_and_watch(PATH).await.unwrap();
    store.insert(PATH, "1");
    store.insert(PATH, "2");

    // The signal resolves once; the second write needs a new watch.
    assert_eq!(signal.await.unwrap(), Ok(()));
    let (value, signal) = store.get_and_watch(PATH).await.unwrap();
    assert_eq!(value.data, b"2");
    store.insert(PATH, "3");
    assert_eq!(signal.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_fail_watchers_resolves_with_service_fault() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let (_, signal) = store.get_and_watch(PATH).await.unwrap();
    store.fail_watchers(PATH, "session expired");

    match signal.await.unwrap() {
        Err(WatchError::Service(reason)) => assert_eq!(reason, "session expired"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_abandoned_watch_does_not_block_writes() {
    let store = MemoryStore::new();
    store.insert(PATH, "0");

    let (_, signal) = store.get_and_watch(PATH).await.unwrap();
    drop(signal);

    store.insert(PATH, "1");
    assert_eq!(store.get(PATH).await.unwrap().data, b"1");
}
