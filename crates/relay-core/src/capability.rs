//! Sink and Source capability contracts.

use crate::{Entry, SinkResult, SourceError, SourceResult};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Accepts entries and writes them to a backend.
#[async_trait]
pub trait Sink<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Writes one entry. Fails with [`crate::SinkError::Write`] naming the key.
    async fn single(&self, entry: Entry<V>) -> SinkResult<()>;

    /// Writes a batch. Fails with [`crate::SinkError::Batch`] naming every
    /// failing key; never reports partial success silently.
    async fn batch(&self, entries: Vec<Entry<V>>) -> SinkResult<()>;

    /// Liveness probe; the error describes the unreachable dependency.
    async fn ping(&self) -> SinkResult<()>;
}

/// Reads entries from a backend log and accepts acknowledgements.
#[async_trait]
pub trait Source<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Runs the fetch loop until [`Source::stop`] or a fatal transport error.
    ///
    /// Entries are delivered on `output`. When the loop exits, `output` is
    /// dropped (closing the channel) and [`SourceError::EndOfStream`] is sent
    /// on `errors`.
    async fn start(&self, output: mpsc::Sender<Entry<V>>, errors: mpsc::Sender<SourceError>);

    /// Requests loop termination.
    async fn stop(&self) -> SourceResult<()>;

    /// Acknowledges processed keys with the backend.
    async fn commit_entry(&self, keys: &[String]) -> SourceResult<()>;

    /// Stable identity used to correlate logs.
    fn name(&self) -> &str;
}
