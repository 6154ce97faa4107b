use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::waiter::PollConfig;

/// Default poll timing, in the form it takes in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDefaults {
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// No deadline when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: None,
        }
    }
}

impl PollDefaults {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            timeout: self.timeout_ms.map(Duration::from_millis),
            retry_delay: Some(Duration::from_millis(self.retry_delay_ms)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info,durable_helpers_core=debug"); `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// JSON lines instead of pretty output
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
