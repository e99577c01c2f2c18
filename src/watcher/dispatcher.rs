use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

/// Callback invoked with the new revision text on every observed change.
pub type UpdateCallback = Box<dyn Fn(String) + Send + Sync>;

/// Consumes change events off the watch loop and runs the registered
/// callback on its own task, so a slow consumer cannot delay re-arming.
///
/// Events arriving while no callback is registered are dropped; there is no
/// buffering and no replay for callbacks registered later.
pub(crate) struct Dispatcher {
    events: mpsc::UnboundedReceiver<String>,
    callback: Arc<ArcSwapOption<UpdateCallback>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<String>,
        callback: Arc<ArcSwapOption<UpdateCallback>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            callback,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("dispatcher stopping");
                    return;
                }
                event = self.events.recv() => match event {
                    Some(revision) => self.dispatch(revision),
                    None => {
                        debug!("event channel closed, dispatcher stopping");
                        return;
                    }
                }
            }
        }
    }

    fn dispatch(&self, revision: String) {
        match self.callback.load_full() {
            Some(callback) => {
                trace!("dispatching revision {revision}");
                callback(revision);
            }
            None => debug!("no update callback registered, dropping revision {revision}"),
        }
    }
}
