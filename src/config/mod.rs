//! Session configuration: scheduler tuning and logging.

mod facade;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one item session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet window for rebuild debouncing, in milliseconds.
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_quiet_window_ms() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: default_quiet_window_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.quiet_window_ms, 300);
        assert_eq!(config.quiet_window(), Duration::from_millis(300));
        assert!(config.logging.enabled);
    }
}
