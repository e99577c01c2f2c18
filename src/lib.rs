//! Watch/notify client for policy enforcers sharing one coordination service.
//!
//! Each enforcer instance holds a [`Watcher`] on a shared path whose value is
//! a monotonically growing revision number. After changing its local policy,
//! an instance calls [`Watcher::update`] to bump the revision; every other
//! instance's armed watch fires, a fresh read picks up the new revision text,
//! and the registered callback runs so the instance can reload.
//!
//! ```rust,ignore
//! let watcher = Watcher::builder("node1:9081").path("/casbin").build().await?;
//! watcher.set_update_callback(|revision| println!("policy changed: {revision}"));
//! watcher.update().await?;
//! ```

mod config;
mod constants;
mod errors;
mod store;
mod utils;
mod watcher;

pub mod proto;

pub use config::*;
pub use constants::*;
pub use errors::*;
pub use store::*;
pub use watcher::*;

#[cfg(test)]
pub mod test_utils;
