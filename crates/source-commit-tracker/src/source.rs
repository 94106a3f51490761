//! Log-backed [`Source`] implementation.

use crate::{CommitTracker, FetchError, LogReader, LogRecord, SourceConfig};
use async_trait::async_trait;
use relay_core::{Entry, Source, SourceError, SourceResult};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Turns a fetched record into the entry delivered downstream.
///
/// The entry key is what consumers later pass to [`Source::commit_entry`].
pub type RecordExtractor<V> = Arc<dyn Fn(&LogRecord) -> Entry<V> + Send + Sync>;

fn record_key(record: &LogRecord) -> String {
    format!("{}-{}", record.offset, record.key_str())
}

/// Entry keyed `"{offset}-{key}"` carrying the record payload.
pub fn value_entry() -> RecordExtractor<Vec<u8>> {
    Arc::new(|record: &LogRecord| Entry::new(record_key(record), record.value.clone()))
}

/// Entry keyed `"{offset}-{key}"` carrying the whole record.
pub fn record_entry() -> RecordExtractor<LogRecord> {
    Arc::new(|record: &LogRecord| Entry::new(record_key(record), record.clone()))
}

/// Reads from a [`LogReader`] and defers offset commits until entries are
/// acknowledged.
pub struct LogSource<R, V> {
    name: String,
    config: SourceConfig,
    reader: Arc<R>,
    extractor: RecordExtractor<V>,
    tracker: CommitTracker<LogRecord>,
    stop_tx: watch::Sender<bool>,
}

enum LoopExit {
    Stopped,
    OutputClosed,
    Fatal,
}

impl<R, V> LogSource<R, V>
where
    R: LogReader,
    V: Send + 'static,
{
    pub fn new(config: SourceConfig, reader: Arc<R>, extractor: RecordExtractor<V>) -> SourceResult<Self> {
        config.validate()?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            name: format!("{}-{}", config.name_prefix, nanos),
            config,
            reader,
            extractor,
            tracker: CommitTracker::new(),
            stop_tx,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Output channel sized by `queue_capacity`.
    pub fn channel(&self) -> (mpsc::Sender<Entry<V>>, mpsc::Receiver<Entry<V>>) {
        mpsc::channel(self.config.queue_capacity)
    }

    /// Number of delivered entries awaiting commit.
    pub fn pending_commits(&self) -> usize {
        self.tracker.len()
    }

    pub async fn ping(&self) -> SourceResult<()> {
        self.reader
            .ping()
            .await
            .map_err(|err| SourceError::Unreachable(err.to_string()))
    }

    /// Forwards `err` unless a stop arrives first. Returns `false` when stopped.
    async fn report(
        errors: &mpsc::Sender<SourceError>,
        stop_rx: &mut watch::Receiver<bool>,
        err: SourceError,
    ) -> bool {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => false,
            _ = errors.send(err) => true,
        }
    }

    async fn run(&self, output: &mpsc::Sender<Entry<V>>, errors: &mpsc::Sender<SourceError>) -> LoopExit {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut failures: u32 = 0;

        loop {
            if *stop_rx.borrow_and_update() {
                return LoopExit::Stopped;
            }

            let fetched = tokio::select! {
                biased;
                _ = stop_rx.changed() => return LoopExit::Stopped,
                fetched = self.reader.fetch() => fetched,
            };

            match fetched {
                Ok(record) => {
                    failures = 0;
                    let entry = (self.extractor)(&record);
                    let key = entry.key.clone();
                    self.tracker.on_deliver(key.clone(), record);

                    let sent = tokio::select! {
                        biased;
                        _ = stop_rx.changed() => None,
                        sent = output.send(entry) => Some(sent.is_ok()),
                    };
                    match sent {
                        Some(true) => {}
                        Some(false) => {
                            self.tracker.take(&[key]);
                            return LoopExit::OutputClosed;
                        }
                        None => {
                            // Never delivered; the broker redelivers it after restart.
                            self.tracker.take(&[key]);
                            return LoopExit::Stopped;
                        }
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "Fatal fetch error");
                    if !Self::report(errors, &mut stop_rx, SourceError::Fatal(err.to_string())).await {
                        return LoopExit::Stopped;
                    }
                    return LoopExit::Fatal;
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.read_backoff(failures);
                    warn!(error = %err, failures, delay_ms = delay.as_millis() as u64, "Fetch failed");
                    if !Self::report(errors, &mut stop_rx, SourceError::Fetch(err.to_string())).await {
                        return LoopExit::Stopped;
                    }

                    tokio::select! {
                        biased;
                        _ = stop_rx.changed() => return LoopExit::Stopped,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<R, V> Source<V> for LogSource<R, V>
where
    R: LogReader,
    V: Send + 'static,
{
    async fn start(&self, output: mpsc::Sender<Entry<V>>, errors: mpsc::Sender<SourceError>) {
        // A new run starts in the running state even after an earlier stop.
        self.stop_tx.send_replace(false);
        let span = info_span!("log_source", name = %self.name, topic = %self.config.topic);
        async move {
            match self.reader.connect(&self.config).await {
                Ok(()) => {
                    info!(group = %self.config.consumer_group, "Source started");
                    let exit = self.run(&output, &errors).await;
                    match exit {
                        LoopExit::Stopped => info!("Source stopped"),
                        LoopExit::OutputClosed => warn!("Output channel closed, stopping source"),
                        LoopExit::Fatal => warn!("Source stopped after fatal error"),
                    }
                    drop(output);
                    if let Err(err) = self.reader.close().await {
                        warn!(error = %err, "Failed to close reader");
                    }
                }
                Err(err) => {
                    error!(error = %err, "Failed to connect reader");
                    let _ = errors.send(SourceError::Unreachable(err.to_string())).await;
                    drop(output);
                }
            }

            let _ = errors
                .send(SourceError::EndOfStream {
                    source_name: self.name.clone(),
                })
                .await;
        }
        .instrument(span)
        .await
    }

    async fn stop(&self) -> SourceResult<()> {
        if !self.stop_tx.send_replace(true) {
            debug!(name = %self.name, "Stop requested");
        }
        Ok(())
    }

    async fn commit_entry(&self, keys: &[String]) -> SourceResult<()> {
        let records = self.tracker.take(keys);
        if records.is_empty() {
            debug!(name = %self.name, requested = keys.len(), "No pending offsets for commit");
            return Ok(());
        }

        let count = records.len();
        self.reader
            .commit(records)
            .await
            .map_err(|err: FetchError| SourceError::Commit(err.to_string()))?;
        debug!(name = %self.name, committed = count, "Committed offsets");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractors_key_by_offset_and_record_key() {
        let record = LogRecord::new("events", 2, 41, b"user-7", b"payload");

        let entry = value_entry()(&record);
        assert_eq!(entry.key, "41-user-7");
        assert_eq!(entry.value, b"payload".to_vec());

        let entry = record_entry()(&record);
        assert_eq!(entry.key, "41-user-7");
        assert_eq!(entry.value.partition, 2);
    }
}
