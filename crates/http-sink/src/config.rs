//! HTTP sink and polling source settings.

use relay_core::CoordinatorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSinkConfig {
    /// Client-side timeout for one request, in milliseconds.
    pub timeout_ms: u64,
    /// Attempts per entry, including the first.
    pub max_retries: u32,
    pub retry_timeout_ms: u64,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 1,
            retry_timeout_ms: 0,
        }
    }
}

impl HttpSinkConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            max_retries: self.max_retries,
            retry_timeout_ms: self.retry_timeout_ms,
            timeout_ms: self.timeout_ms,
            ..Default::default()
        }
    }
}

/// Settings for [`crate::HttpPollingSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// Delay between polls, in milliseconds. The first poll runs immediately.
    pub poll_interval_ms: u64,
    /// Client-side timeout for one poll, in milliseconds.
    pub timeout_ms: u64,
    /// Prefix of the source name; a unix-nanos suffix is appended.
    pub name_prefix: String,
    /// Capacity of the channel returned by `channel()`.
    pub queue_capacity: usize,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            timeout_ms: 30_000,
            name_prefix: "http-polling-source".to_string(),
            queue_capacity: 100,
        }
    }
}

impl HttpSourceConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            poll_interval_ms: interval.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
