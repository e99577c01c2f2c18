//! Watcher Error Hierarchy
//!
//! Defines the error types surfaced by the watch/notify subsystem,
//! categorized by protocol step: connecting, reading, parsing the stored
//! revision, conditional writing, and the armed watch itself.

use std::num::ParseIntError;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable connection to the coordination service could be established
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Versioned read of the watched path failed
    #[error("read of {path} failed: {reason}")]
    Read { path: String, reason: String },

    /// The stored revision is not a decimal non-negative integer
    #[error(transparent)]
    Parse(#[from] ParseRevisionError),

    /// Conditional write rejected: another writer updated the path since the
    /// version stamp was observed
    #[error("conditional write of {path} rejected: version stamp is stale")]
    CasConflict { path: String },

    /// Write failed for a reason other than a stale version stamp
    #[error("write of {path} failed: {reason}")]
    Write { path: String, reason: String },

    /// The coordination service reported a fault on an armed watch
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A single attempt exceeded the per-attempt timeout
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The bounded-retry wrapper gave up
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted { attempts: usize, last: Box<Error> },

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The comma-separated host list was empty
    #[error("host list contains no endpoints")]
    EmptyHostList,

    /// Malformed endpoint address
    #[error("invalid URI format: {0}")]
    InvalidUri(String),

    /// Every host in the list was probed and none accepted a connection
    #[error("no reachable host among {hosts:?}")]
    NoReachableHost { hosts: Vec<String> },

    /// gRPC transport layer errors
    #[error(transparent)]
    Transport(#[from] Box<tonic::transport::Error>),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseRevisionError {
    /// The stored value is not valid UTF-8
    #[error("stored revision is not valid UTF-8")]
    NotUtf8,

    /// The stored text is not a non-negative integer
    #[error("stored revision {text:?} is not a non-negative integer")]
    NotAnInteger {
        text: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The armed watch resolved with a service-side fault
    #[error("coordination service reported a watch fault: {0}")]
    Service(String),

    /// The fire signal's channel closed before the watch fired
    #[error("watch channel closed before firing")]
    ChannelClosed,
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        ConnectionError::Transport(Box::new(err)).into()
    }
}

impl Error {
    /// True when a retry with a freshly observed version stamp may succeed.
    pub fn is_cas_conflict(&self) -> bool {
        matches!(self, Error::CasConflict { .. })
    }
}
