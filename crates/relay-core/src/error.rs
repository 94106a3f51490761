//! Error taxonomy for the relay.
//!
//! - [`EntryError`]: why one key failed (captured, never fatal to a batch).
//! - [`SinkError`]: what a sink call returns.
//! - [`SourceError`]: what a source reports on its error channel.
//! - [`CoreError`]: configuration loading and other ambient failures.

use crate::BatchError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by backend collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single entry.
///
/// Cloneable so one backend failure can be attributed to several keys.
#[derive(Debug, Clone, Error)]
pub enum EntryError {
    /// The backend reported an error for this entry (after retries).
    #[error("{0}")]
    Rejected(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// No result arrived for this entry before the join deadline expired.
    #[error("timeout after {budget:?} waiting for the write to complete")]
    Timeout { budget: Duration },
}

impl EntryError {
    /// Wraps a backend error.
    pub fn from_backend(error: BoxError) -> Self {
        EntryError::Rejected(Arc::from(error))
    }

    /// Builds a rejection from a plain message.
    pub fn rejected(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::from_backend(message.into())
    }

    pub fn timeout(budget: Duration) -> Self {
        EntryError::Timeout { budget }
    }

    /// True when the coordinator never heard back from the writer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EntryError::Timeout { .. })
    }
}

/// Error returned by [`crate::Sink`] operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A single-entry write failed.
    #[error("failed to write entry {key}: {source}")]
    Write { key: String, source: EntryError },

    /// One or more entries of a batch failed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// A backend dependency is not reachable.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The sink is misconfigured; nothing was written.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SinkError {
    /// The per-key failures carried by this error, if it is a batch error.
    pub fn as_batch(&self) -> Option<&BatchError> {
        match self {
            SinkError::Batch(batch) => Some(batch),
            _ => None,
        }
    }
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Error reported by a [`crate::Source`].
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// A fetch failed but the read loop keeps running.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The transport is gone (closed connection, end of stream); the read loop stops.
    #[error("fatal transport error: {0}")]
    Fatal(String),

    /// The read loop of the named source has exited. Sent exactly once.
    #[error("source {source_name} reached end of stream")]
    EndOfStream { source_name: String },

    /// The backend offset-commit call failed.
    #[error("commit failed: {0}")]
    Commit(String),

    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The source is misconfigured; it was never started.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SourceError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, SourceError::EndOfStream { .. })
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Ambient errors: configuration files and the like.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
