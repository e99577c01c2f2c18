//! Configuration for watcher handles.
//!
//! Provides hierarchical loading from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML config file
//! 3. Environment variables (highest priority, `WATCHER__*`)

mod retry;
pub use retry::*;

use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_WATCH_PATH;
use crate::Error;
use crate::Result;

/// Tunables for a watcher handle's single coordination-service connection
/// and its update protocol.
///
/// # Key Configuration Areas
/// - Connection establishment (TCP handshake timeout)
/// - Request/response lifecycle control
/// - HTTP/2 keepalive for the long-lived watch connection
/// - Retry policy for contended revision bumps
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Path holding the revision record
    #[serde(default = "default_watch_path")]
    pub path: String,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// gRPC request completion timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,

    /// TCP keepalive in seconds
    #[serde(default = "default_tcp_keepalive")]
    pub tcp_keepalive_in_secs: u64,

    /// HTTP2 keepalive ping interval in seconds
    #[serde(default = "default_h2_keepalive_interval")]
    pub http2_keep_alive_interval_in_secs: u64,

    /// HTTP2 keepalive timeout in seconds
    #[serde(default = "default_h2_keepalive_timeout")]
    pub http2_keep_alive_timeout_in_secs: u64,

    /// Enable Gzip compression for network traffic
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,

    /// Backoff policy used by `update_with_retry`
    #[serde(default)]
    pub update_retry: BackoffPolicy,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            path: default_watch_path(),
            connect_timeout_in_ms: default_connect_timeout(),
            request_timeout_in_ms: default_request_timeout(),
            tcp_keepalive_in_secs: default_tcp_keepalive(),
            http2_keep_alive_interval_in_secs: default_h2_keepalive_interval(),
            http2_keep_alive_timeout_in_secs: default_h2_keepalive_timeout(),
            enable_compression: default_enable_compression(),
            update_retry: BackoffPolicy::default(),
        }
    }
}

impl WatcherConfig {
    /// Load configuration with priority: defaults, then an optional TOML
    /// file, then `WATCHER__*` environment variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("WATCHER")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let loaded: Self = config.build()?.try_deserialize().map_err(Error::Config)?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validates configuration sanity before a connection is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() || !self.path.starts_with('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch path {:?} must be absolute",
                self.path
            ))));
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connect timeout must be > 0".to_string(),
            )));
        }

        if self.request_timeout_in_ms != 0 && self.request_timeout_in_ms <= self.connect_timeout_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "request timeout {}ms must exceed connect timeout {}ms",
                self.request_timeout_in_ms, self.connect_timeout_in_ms
            ))));
        }

        if self.http2_keep_alive_timeout_in_secs >= self.http2_keep_alive_interval_in_secs {
            return Err(Error::Config(ConfigError::Message(format!(
                "keepalive timeout {}s must be < interval {}s",
                self.http2_keep_alive_timeout_in_secs, self.http2_keep_alive_interval_in_secs
            ))));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_watch_path() -> String {
    DEFAULT_WATCH_PATH.to_string()
}
fn default_connect_timeout() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    3000
}
fn default_tcp_keepalive() -> u64 {
    300
}
fn default_h2_keepalive_interval() -> u64 {
    60
}
fn default_h2_keepalive_timeout() -> u64 {
    20
}
fn default_enable_compression() -> bool {
    true
}
