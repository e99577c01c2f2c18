//! Coordination-service access layer.
//!
//! [`CoordinationStore`] is the seam between the watcher and the hierarchical
//! version-stamped key store it coordinates through. Two implementations are
//! provided:
//!
//! - [`GrpcStore`]: remote access over gRPC
//! - [`MemoryStore`]: in-process store for embedded use and tests
//!
//! The trait mirrors the service contract exactly: versioned read, versioned
//! conditional write, and a combined read + one-shot watch arm.

mod grpc_store;
mod memory_store;

pub use grpc_store::*;
pub use memory_store::*;

#[cfg(test)]
mod memory_store_test;

#[cfg(test)]
use mockall::automock;
use tokio::sync::oneshot;
use tonic::async_trait;

use crate::Result;
use crate::WatchError;

/// Opaque version stamp assigned by the coordination service on every write.
///
/// Compared for equality when issuing conditional writes; never interpreted
/// numerically by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(pub(crate) i64);

/// A value read from the store together with the stamp of the write that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub data: Vec<u8>,
    pub version: Version,
}

/// One-shot firing signal of an armed watch.
///
/// Resolves exactly once: `Ok(())` when the watched path changed, or a
/// [`WatchError`] when the service reported a fault. Single-use; a new watch
/// must be armed after it resolves. A dropped sender is reported by the
/// receiver as a closed channel and is treated as [`WatchError::ChannelClosed`].
pub type WatchSignal = oneshot::Receiver<std::result::Result<(), WatchError>>;

/// Versioned key store with one-shot change watches.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`, safe for concurrent access:
/// the watch loop and explicit `update()` calls share one store handle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationStore: Send + Sync + 'static {
    /// Versioned read of `path`.
    async fn get(&self, path: &str) -> Result<VersionedValue>;

    /// Conditional write of `path`, keyed on the version stamp observed by
    /// the caller's last read.
    ///
    /// # Errors
    /// - [`crate::Error::CasConflict`] when `expected` is stale
    /// - [`crate::Error::Write`] for any other write failure
    async fn compare_and_set(&self, path: &str, value: Vec<u8>, expected: Version) -> Result<Version>;

    /// Versioned read of `path` that also arms a one-shot watch on it.
    ///
    /// The returned value is the state at arming time; the signal resolves
    /// once when the path is next written.
    async fn get_and_watch(&self, path: &str) -> Result<(VersionedValue, WatchSignal)>;
}
