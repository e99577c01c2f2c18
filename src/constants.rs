/// Path watched when the caller does not provide one.
pub const DEFAULT_WATCH_PATH: &str = "/casbin";

/// Textual revision a freshly seeded path starts from.
pub const INITIAL_REVISION: &str = "0";
