use dashmap::DashMap;
use tokio::sync::oneshot;
use tonic::async_trait;
use tracing::debug;

use super::CoordinationStore;
use super::Version;
use super::VersionedValue;
use super::WatchSignal;
use crate::Error;
use crate::Result;
use crate::WatchError;

type Waiter = oneshot::Sender<std::result::Result<(), WatchError>>;

struct PathState {
    data: Vec<u8>,
    version: i64,
    waiters: Vec<Waiter>,
}

/// In-process coordination store.
///
/// Gives embedded deployments (and tests) the same versioned-read /
/// conditional-write / one-shot-watch contract the remote store offers,
/// without a network hop. Share one instance across handles via `Arc` to
/// coordinate watchers inside a single process.
#[derive(Default)]
pub struct MemoryStore {
    paths: DashMap<String, PathState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `path`, or overwrites it unconditionally.
    ///
    /// A fresh path starts at version 0; an overwrite bumps the version and
    /// fires armed watches, like any other write.
    pub fn insert(&self, path: impl Into<String>, value: impl Into<Vec<u8>>) {
        let mut entry = self.paths.entry(path.into()).or_insert_with(|| PathState {
            data: Vec::new(),
            version: -1,
            waiters: Vec::new(),
        });
        entry.data = value.into();
        entry.version += 1;
        Self::fire(&mut entry.waiters, Ok(()));
    }

    /// Resolves every armed watch on `path` with a service fault.
    #[cfg(test)]
    pub(crate) fn fail_watchers(&self, path: &str, reason: &str) {
        if let Some(mut entry) = self.paths.get_mut(path) {
            let fault = WatchError::Service(reason.to_string());
            Self::fire(&mut entry.waiters, Err(fault));
        }
    }

    fn fire(waiters: &mut Vec<Waiter>, outcome: std::result::Result<(), WatchError>) {
        for waiter in waiters.drain(..) {
            if waiter.send(outcome.clone()).is_err() {
                debug!("armed watch was abandoned before firing");
            }
        }
    }

    fn missing(path: &str) -> Error {
        Error::Read {
            path: path.to_string(),
            reason: "path not found".to_string(),
        }
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<VersionedValue> {
        let entry = self.paths.get(path).ok_or_else(|| Self::missing(path))?;
        Ok(VersionedValue {
            data: entry.data.clone(),
            version: Version(entry.version),
        })
    }

    async fn compare_and_set(&self, path: &str, value: Vec<u8>, expected: Version) -> Result<Version> {
        let mut entry = self.paths.get_mut(path).ok_or_else(|| Error::Write {
            path: path.to_string(),
            reason: "path not found".to_string(),
        })?;

        if entry.version != expected.0 {
            return Err(Error::CasConflict {
                path: path.to_string(),
            });
        }

        entry.data = value;
        entry.version += 1;
        let version = Version(entry.version);
        Self::fire(&mut entry.waiters, Ok(()));
        Ok(version)
    }

    async fn get_and_watch(&self, path: &str) -> Result<(VersionedValue, WatchSignal)> {
        let mut entry = self.paths.get_mut(path).ok_or_else(|| Self::missing(path))?;
        let current = VersionedValue {
            data: entry.data.clone(),
            version: Version(entry.version),
        };

        let (tx, rx) = oneshot::channel();
        entry.waiters.push(tx);
        Ok((current, rx))
    }
}
