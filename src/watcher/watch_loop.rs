use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;

use crate::CoordinationStore;
use crate::WatchError;

/// Observable lifecycle of a handle's background watch loop.
///
/// `Failed` and `Stopped` are terminal: the loop never re-arms after either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    /// No watch registered yet
    Idle,
    /// A one-shot watch is registered and waiting to fire
    Armed,
    /// The watch fired and a fresh read of the path is in flight
    Fetching,
    /// Arming, the armed watch, or the follow-up read errored
    Failed(String),
    /// The handle was shut down
    Stopped,
}

impl WatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WatchState::Failed(_) | WatchState::Stopped)
    }
}

/// Cyclic arm/await/fetch task behind a [`Watcher`](crate::Watcher).
///
/// Each cycle registers a fresh one-shot watch, waits for it to fire, then
/// performs a separate versioned read and forwards the revision text to the
/// dispatcher. The value returned while arming is discarded: acting on the
/// post-fire read keeps the handle from notifying on a stale snapshot.
pub(crate) struct WatchLoop {
    store: Arc<dyn CoordinationStore>,
    path: String,
    events: mpsc::UnboundedSender<String>,
    state: watch::Sender<WatchState>,
    shutdown: CancellationToken,
}

impl WatchLoop {
    pub(crate) fn new(
        store: Arc<dyn CoordinationStore>,
        path: String,
        events: mpsc::UnboundedSender<String>,
        state: watch::Sender<WatchState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            path,
            events,
            state,
            shutdown,
        }
    }

    pub(crate) async fn run(self) {
        loop {
            let signal = tokio::select! {
                _ = self.shutdown.cancelled() => return self.stop(),
                armed = self.store.get_and_watch(&self.path) => match armed {
                    Ok((_, signal)) => signal,
                    Err(e) => return self.fail(format!("arming watch on {} failed: {e}", self.path)),
                }
            };
            self.state.send_replace(WatchState::Armed);

            let fired = tokio::select! {
                _ = self.shutdown.cancelled() => return self.stop(),
                fired = signal => fired,
            };
            match fired {
                Ok(Ok(())) => {}
                Ok(Err(fault)) => return self.fail(format!("watch on {} faulted: {fault}", self.path)),
                Err(_) => {
                    return self.fail(format!(
                        "watch on {} lost: {}",
                        self.path,
                        WatchError::ChannelClosed
                    ))
                }
            }

            self.state.send_replace(WatchState::Fetching);
            let value = tokio::select! {
                _ = self.shutdown.cancelled() => return self.stop(),
                fetched = self.store.get(&self.path) => match fetched {
                    Ok(value) => value,
                    Err(e) => return self.fail(format!("read of {} after fire failed: {e}", self.path)),
                }
            };

            let revision = String::from_utf8_lossy(&value.data).into_owned();
            debug!("[:WatchLoop:run] change observed on {}: revision {revision}", self.path);
            if self.events.send(revision).is_err() {
                return self.stop();
            }
        }
    }

    fn stop(&self) {
        debug!("[:WatchLoop:run] watch loop on {} stopped", self.path);
        self.state.send_replace(WatchState::Stopped);
    }

    fn fail(&self, reason: String) {
        error!("[:WatchLoop:run] watch loop on {} terminated: {reason}", self.path);
        self.state.send_replace(WatchState::Failed(reason));
    }
}
