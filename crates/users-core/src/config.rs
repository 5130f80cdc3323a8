//! Directory configuration

use std::time::Duration;

/// Default upper bound for a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the user directory
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Upper bound for each store call; exceeding it fails the operation
    pub store_timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}
