//! Executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default seconds between two order status reads
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 15;

/// Polling settings for the fill waiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Seconds to sleep before each order status read
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Give up on a leg after this many seconds (None = wait forever)
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
}

fn default_check_interval_secs() -> u64 { DEFAULT_CHECK_INTERVAL_SECS }

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            max_wait_secs: None,
        }
    }
}

impl ExecutorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Settings handed to the fill waiter
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            check_interval: self.check_interval(),
            max_wait: self.max_wait(),
        }
    }
}

/// How the fill waiter polls a single order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub check_interval: Duration,
    pub max_wait: Option<Duration>,
}

impl WaitPolicy {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            check_interval,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        ExecutorConfig::default().wait_policy()
    }
}
