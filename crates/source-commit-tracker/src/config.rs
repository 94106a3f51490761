//! Consumer-group settings for a [`crate::LogSource`].

use relay_core::{SourceError, SourceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a consumer group with no committed offset starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Broker addresses (`host:port`).
    pub hosts: Vec<String>,
    pub topic: String,
    pub consumer_group: String,
    /// Prefix of the source name; a timestamp suffix keeps names unique.
    pub name_prefix: String,
    /// Capacity of the output channel handed to the read loop.
    pub queue_capacity: usize,
    /// Maximum time the broker may hold a fetch open, in milliseconds.
    pub max_wait_ms: u64,
    /// How often partition lag is refreshed, in seconds.
    pub read_lag_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Offset commit flush interval in milliseconds.
    pub commit_interval_ms: u64,
    pub partition_watch_interval_secs: u64,
    pub watch_partition_changes: bool,
    pub session_timeout_secs: u64,
    pub rebalance_timeout_secs: u64,
    pub join_group_backoff_secs: u64,
    pub start_offset: StartOffset,
    /// Delay before fetching again after a recoverable fetch error, in milliseconds.
    pub read_backoff_min_ms: u64,
    pub read_backoff_max_ms: u64,
    pub max_attempts: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            topic: String::new(),
            consumer_group: String::new(),
            name_prefix: "log-source".to_string(),
            queue_capacity: 100,
            max_wait_ms: 10_000,
            read_lag_interval_secs: 60,
            heartbeat_interval_secs: 3,
            commit_interval_ms: 1000,
            partition_watch_interval_secs: 5,
            watch_partition_changes: true,
            session_timeout_secs: 30,
            rebalance_timeout_secs: 30,
            join_group_backoff_secs: 5,
            start_offset: StartOffset::Last,
            read_backoff_min_ms: 100,
            read_backoff_max_ms: 1000,
            max_attempts: 5,
        }
    }
}

impl SourceConfig {
    pub fn new(hosts: Vec<String>, topic: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            hosts,
            topic: topic.into(),
            consumer_group: consumer_group.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SourceResult<()> {
        if self.hosts.is_empty() {
            return Err(SourceError::Config("at least one broker host is required".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(SourceError::Config("topic must not be empty".to_string()));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(SourceError::Config("consumer_group must not be empty".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(SourceError::Config("queue_capacity must be positive".to_string()));
        }
        if self.read_backoff_min_ms > self.read_backoff_max_ms {
            return Err(SourceError::Config(
                "read_backoff_min_ms must not exceed read_backoff_max_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Delay after the `failures`-th consecutive recoverable fetch error:
    /// doubles from the minimum, capped at the maximum.
    pub fn read_backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let delay = self.read_backoff_min_ms.saturating_mul(1 << exponent);
        Duration::from_millis(delay.min(self.read_backoff_max_ms))
    }
}
