use serde::Deserialize;
use serde::Serialize;

/// Bounded exponential backoff parameters for contended revision bumps.
///
/// `Watcher::update` itself is single-attempt; this policy only drives the
/// `update_with_retry` wrapper.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single attempt timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> usize {
    5
}
fn default_op_timeout_ms() -> u64 {
    3000
}
fn default_base_delay_ms() -> u64 {
    20
}
fn default_max_delay_ms() -> u64 {
    1000
}
