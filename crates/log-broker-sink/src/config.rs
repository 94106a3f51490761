//! Producer settings.

use relay_core::{SinkError, SinkResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogBrokerSinkConfig {
    pub hosts: Vec<String>,
    pub topic: String,
    /// Attempts per produce call, including the first.
    pub max_retries: u32,
    /// Base backoff between attempts in milliseconds.
    pub retry_timeout_ms: u64,
    /// Messages buffered before a partition batch is sent.
    pub batch_size: usize,
    /// How often incomplete batches are flushed, in seconds.
    pub batch_timeout_secs: u64,
    /// Bound on a single produce attempt, in seconds.
    pub write_timeout_secs: u64,
    /// How often the partition list is refreshed, in seconds.
    pub rebalance_timeout_secs: u64,
    /// Replica acknowledgements required per produce; -1 waits for all.
    pub required_acks: i32,
    /// Fire-and-forget produce: calls return immediately and failures are
    /// only logged.
    pub async_writes: bool,
}

impl Default for LogBrokerSinkConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            topic: String::new(),
            max_retries: 10,
            retry_timeout_ms: 100,
            batch_size: 100,
            batch_timeout_secs: 1,
            write_timeout_secs: 5,
            rebalance_timeout_secs: 15,
            required_acks: -1,
            async_writes: false,
        }
    }
}

impl LogBrokerSinkConfig {
    pub fn new(hosts: Vec<String>, topic: impl Into<String>) -> Self {
        Self {
            hosts,
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    pub fn validate(&self) -> SinkResult<()> {
        if self.hosts.is_empty() {
            return Err(SinkError::Config("at least one broker host is required".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(SinkError::Config("topic must not be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(SinkError::Config("batch_size must be positive".to_string()));
        }
        if self.required_acks < -1 {
            return Err(SinkError::Config(format!(
                "required_acks must be -1, 0 or a replica count, got {}",
                self.required_acks
            )));
        }
        Ok(())
    }
}
