//! End-to-end watch/notify scenarios over the public API, with several
//! handles coordinating through one shared in-process store.

use std::sync::Arc;

use policy_watcher::CoordinationStore;
use policy_watcher::MemoryStore;
use policy_watcher::WatchState;
use policy_watcher::Watcher;
use policy_watcher::DEFAULT_WATCH_PATH;
use policy_watcher::INITIAL_REVISION;
use tokio::sync::mpsc;

async fn watcher_on(store: Arc<MemoryStore>) -> Watcher {
    Watcher::builder("unused:0").store(store).build().await.unwrap()
}

fn notifications(watcher: &Watcher) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.set_update_callback(move |revision| {
        tx.send(revision).unwrap();
    });
    rx
}

async fn wait_for_armed(watcher: &Watcher) {
    let mut state = watcher.subscribe_state();
    state.wait_for(|s| *s == WatchState::Armed).await.unwrap();
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert(DEFAULT_WATCH_PATH, INITIAL_REVISION);
    store
}

#[tokio::test]
async fn test_update_on_one_handle_notifies_all_handles() {
    let store = seeded_store();
    let writer = watcher_on(store.clone()).await;
    let reader = watcher_on(store.clone()).await;

    let mut writer_events = notifications(&writer);
    let mut reader_events = notifications(&reader);
    wait_for_armed(&writer).await;
    wait_for_armed(&reader).await;

    writer.update().await.unwrap();

    // every armed handle sees the change, the writer included
    assert_eq!(reader_events.recv().await.unwrap(), "1");
    assert_eq!(writer_events.recv().await.unwrap(), "1");

    writer.shutdown().await;
    reader.shutdown().await;
}

#[tokio::test]
async fn test_serialized_updates_arrive_in_order() {
    let store = seeded_store();
    let writer = watcher_on(store.clone()).await;
    let reader = watcher_on(store.clone()).await;
    let mut events = notifications(&reader);

    for expected in ["1", "2", "3", "4"] {
        wait_for_armed(&reader).await;
        writer.update().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), expected);
    }

    writer.shutdown().await;
    reader.shutdown().await;
}

#[tokio::test]
async fn test_contended_updates_converge_with_retry() {
    let store = seeded_store();
    let a = watcher_on(store.clone()).await;
    let b = watcher_on(store.clone()).await;

    let (ra, rb) = tokio::join!(a.update_with_retry(), b.update_with_retry());
    ra.unwrap();
    rb.unwrap();

    let value = store.get(DEFAULT_WATCH_PATH).await.unwrap();
    assert_eq!(value.data, b"2");

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_handle_lifecycle() {
    let store = seeded_store();
    let watcher = watcher_on(store).await;

    wait_for_armed(&watcher).await;
    assert!(watcher.is_running());

    watcher.shutdown().await;
    assert_eq!(watcher.state(), WatchState::Stopped);
    assert!(!watcher.is_running());
}
