//! Watch/notify handle over a version-stamped coordination path.
//!
//! A [`Watcher`] keeps one long-lived watch on a single path and invokes the
//! registered callback with the revision text after every observed change.
//! Peers announce their own writes with [`Watcher::update`], which bumps the
//! revision through a version-guarded read-modify-write.
//!
//! Two background tasks run per handle: the watch loop (arm, await fire,
//! fetch) and the dispatcher (callback invocation). They are decoupled by a
//! channel so a slow callback never delays re-arming.

mod builder;
mod dispatcher;
mod watch_loop;

pub use builder::*;
pub use dispatcher::UpdateCallback;
pub use watch_loop::WatchState;


use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;

use crate::BackoffPolicy;
use crate::CoordinationStore;
use crate::ParseRevisionError;
use crate::Result;

/// Handle to one watched path on the coordination service.
///
/// Built via [`Watcher::builder`]. Dropping the handle cancels its background
/// tasks; [`shutdown`](Watcher::shutdown) does the same and waits for them.
pub struct Watcher {
    pub(crate) store: Arc<dyn CoordinationStore>,
    pub(crate) path: String,
    pub(crate) update_retry: BackoffPolicy,
    pub(crate) callback: Arc<ArcSwapOption<UpdateCallback>>,
    pub(crate) state: watch::Receiver<WatchState>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("path", &self.path)
            .field("update_retry", &self.update_retry)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Starts building a handle for a comma-separated host list, e.g.
    /// `"node1:9081,node2:9081"`.
    pub fn builder(hosts: impl Into<String>) -> WatcherBuilder {
        WatcherBuilder::new(hosts.into())
    }

    /// Registers the callback invoked with the revision text on every
    /// observed change, replacing any previous one.
    ///
    /// Changes observed before registration are not replayed.
    pub fn set_update_callback<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.callback.store(Some(Arc::new(Box::new(callback))));
    }

    /// Announces a local policy change by bumping the stored revision.
    ///
    /// Reads the current revision, parses it, and writes `revision + 1`
    /// conditioned on the version stamp the read observed. Single attempt:
    /// a concurrent writer surfaces as [`crate::Error::CasConflict`] and the
    /// store is left unchanged by this call.
    pub async fn update(&self) -> Result<()> {
        let current = self.store.get(&self.path).await?;
        let revision = parse_revision(&current.data)?;
        let next = revision + 1;

        debug!("[:Watcher:update] bumping revision on {}: {revision} -> {next}", self.path);
        self.store
            .compare_and_set(&self.path, next.to_string().into_bytes(), current.version)
            .await?;
        Ok(())
    }

    /// [`update`](Watcher::update) wrapped in bounded retry with exponential
    /// backoff, driven by the handle's [`BackoffPolicy`].
    ///
    /// Only version-stamp conflicts are retried; each retry re-reads the
    /// path so the next attempt carries a fresh stamp. Other errors return
    /// immediately.
    pub async fn update_with_retry(&self) -> Result<()> {
        crate::utils::run_with_backoff(|| self.update(), &self.update_retry, crate::Error::is_cas_conflict)
            .await
    }

    /// Current state of the background watch loop.
    pub fn state(&self) -> WatchState {
        self.state.borrow().clone()
    }

    /// Receiver observing every state transition of the watch loop. Useful
    /// for awaiting `Armed` after startup or detecting `Failed`.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// False once the loop has reached a terminal state or shutdown began.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.state.borrow().is_terminal()
    }

    /// Path holding the revision record.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cancels the watch loop and the dispatcher and waits for both to exit.
    /// Idempotent.
    pub async fn shutdown(&self) {
        debug!("[:Watcher:shutdown] shutting down watcher on {}", self.path);
        self.shutdown.cancel();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("[:Watcher:shutdown] background task panicked: {e}");
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Parses the stored revision text into a non-negative integer.
pub(crate) fn parse_revision(data: &[u8]) -> Result<u64> {
    let text = std::str::from_utf8(data).map_err(|_| ParseRevisionError::NotUtf8)?;
    let revision = text.parse::<u64>().map_err(|source| ParseRevisionError::NotAnInteger {
        text: text.to_string(),
        source,
    })?;
    Ok(revision)
}
