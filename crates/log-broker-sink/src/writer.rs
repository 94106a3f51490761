//! Producer client contract.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("produce rejected: {0}")]
    Rejected(String),
}

/// Produces messages to one topic.
#[async_trait]
pub trait LogWriter: Send + Sync + 'static {
    /// Writes all `messages`; either every message is acknowledged or the
    /// call fails.
    async fn write_messages(&self, messages: &[Message]) -> Result<(), BrokerError>;

    /// Brokers currently known to the client.
    async fn brokers(&self) -> Result<Vec<String>, BrokerError>;
}
