use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::dispatcher::Dispatcher;
use super::watch_loop::WatchLoop;
use super::watch_loop::WatchState;
use super::Watcher;
use crate::BackoffPolicy;
use crate::CoordinationStore;
use crate::GrpcStore;
use crate::Result;
use crate::WatcherConfig;

/// Fallible constructor for [`Watcher`].
///
/// Connection establishment happens in [`build`](WatcherBuilder::build), so a
/// bad host list or an unreachable service surfaces as an `Err` instead of a
/// handle whose background loop dies immediately.
///
/// # Example
///
/// ```rust,ignore
/// let watcher = Watcher::builder("node1:9081,node2:9081")
///     .path("/casbin")
///     .connect_timeout(Duration::from_millis(500))
///     .build()
///     .await?;
/// ```
pub struct WatcherBuilder {
    hosts: String,
    config: WatcherConfig,
    store: Option<Arc<dyn CoordinationStore>>,
}

impl WatcherBuilder {
    pub(crate) fn new(hosts: String) -> Self {
        Self {
            hosts,
            config: WatcherConfig::default(),
            store: None,
        }
    }

    /// Path holding the revision record. Defaults to `/casbin`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_in_ms = timeout.as_millis() as u64;
        self
    }

    pub fn enable_compression(mut self, enable: bool) -> Self {
        self.config.enable_compression = enable;
        self
    }

    /// Backoff policy used by [`Watcher::update_with_retry`].
    pub fn update_retry(mut self, policy: BackoffPolicy) -> Self {
        self.config.update_retry = policy;
        self
    }

    /// Replaces the whole configuration, e.g. one produced by
    /// [`WatcherConfig::load`].
    pub fn set_config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses the given store instead of connecting over gRPC. The host list is
    /// ignored when a store is supplied.
    pub fn store(mut self, store: Arc<dyn CoordinationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the configuration, connects to the first reachable host and
    /// spawns the watch loop and the dispatcher.
    pub async fn build(self) -> Result<Watcher> {
        self.config.validate()?;

        let store: Arc<dyn CoordinationStore> = match self.store {
            Some(store) => store,
            None => Arc::new(GrpcStore::connect(&self.hosts, &self.config).await?),
        };

        let callback = Arc::new(ArcSwapOption::empty());
        let (state_tx, state_rx) = watch::channel(WatchState::Idle);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let dispatcher = Dispatcher::new(event_rx, callback.clone(), shutdown.clone());
        let watch_loop = WatchLoop::new(
            store.clone(),
            self.config.path.clone(),
            event_tx,
            state_tx,
            shutdown.clone(),
        );

        let tasks = vec![tokio::spawn(dispatcher.run()), tokio::spawn(watch_loop.run())];

        Ok(Watcher {
            store,
            path: self.config.path.clone(),
            update_retry: self.config.update_retry.clone(),
            callback,
            state: state_rx,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }
}
