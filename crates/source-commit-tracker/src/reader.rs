//! Backend log reader contract.

use crate::SourceConfig;
use async_trait::async_trait;
use thiserror::Error;

/// One record fetched from a partitioned log. Doubles as the commit cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, Vec<u8>)>,
}

impl LogRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, key: &[u8], value: &[u8]) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: key.to_vec(),
            value: value.to_vec(),
            headers: Vec::new(),
        }
    }

    /// Record key rendered as text; invalid UTF-8 is replaced.
    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The broker closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// The reader will never produce another record.
    #[error("end of stream")]
    EndOfStream,

    #[error("connect failed: {0}")]
    Connect(String),

    /// A recoverable fetch failure; the next fetch may succeed.
    #[error("{0}")]
    Transient(String),

    #[error("commit rejected: {0}")]
    Commit(String),
}

impl FetchError {
    /// Whether the read loop must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::ConnectionClosed | FetchError::EndOfStream)
    }
}

/// A consumer-group client for one topic.
#[async_trait]
pub trait LogReader: Send + Sync + 'static {
    async fn connect(&self, config: &SourceConfig) -> Result<(), FetchError>;

    /// Waits for the next record.
    async fn fetch(&self) -> Result<LogRecord, FetchError>;

    /// Commits the offsets of `records` for the consumer group.
    async fn commit(&self, records: Vec<LogRecord>) -> Result<(), FetchError>;

    async fn ping(&self) -> Result<(), FetchError>;

    async fn close(&self) -> Result<(), FetchError>;
}
