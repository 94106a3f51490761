//! [`Sink`] producing to a [`LogWriter`].

use crate::{BrokerError, LogBrokerSinkConfig, LogWriter, Message};
use async_trait::async_trait;
use relay_core::{
    entry_key, BatchError, BoxError, Entry, EntryError, KeyExtractor, Sink, SinkError, SinkResult,
};
use retriable_write_coordinator::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Encodes an entry's value as the message payload.
pub type Serializer<V> = Arc<dyn Fn(&Entry<V>) -> Result<Vec<u8>, BoxError> + Send + Sync>;

/// Sends the value bytes unchanged.
pub fn bytes_serializer<V: AsRef<[u8]>>() -> Serializer<V> {
    Arc::new(|entry: &Entry<V>| -> Result<Vec<u8>, BoxError> { Ok(entry.value.as_ref().to_vec()) })
}

/// Encodes the value as JSON.
pub fn json_serializer<V: Serialize>() -> Serializer<V> {
    Arc::new(|entry: &Entry<V>| -> Result<Vec<u8>, BoxError> { Ok(serde_json::to_vec(&entry.value)?) })
}

pub struct LogBrokerSink<W, V> {
    writer: Arc<W>,
    config: LogBrokerSinkConfig,
    retry: RetryPolicy,
    key_extractor: KeyExtractor<V>,
    serializer: Serializer<V>,
}

/// One produce call: retried per policy, each attempt bounded by `write_timeout`.
async fn produce<W: LogWriter>(
    writer: &W,
    retry: RetryPolicy,
    write_timeout: Duration,
    messages: &[Message],
) -> Result<(), BrokerError> {
    retry
        .execute(|| async move {
            match tokio::time::timeout(write_timeout, writer.write_messages(messages)).await {
                Ok(result) => result,
                Err(_) => Err(BrokerError::Timeout(write_timeout)),
            }
        })
        .await
}

impl<W, V> LogBrokerSink<W, V>
where
    W: LogWriter,
    V: Send + Sync + 'static,
{
    /// Validates `config` and checks that the cluster reports brokers.
    pub async fn connect(config: LogBrokerSinkConfig, writer: Arc<W>, serializer: Serializer<V>) -> SinkResult<Self> {
        config.validate()?;
        let sink = Self {
            writer,
            retry: RetryPolicy::new(config.max_retries, config.retry_timeout()),
            config,
            key_extractor: entry_key(),
            serializer,
        };
        sink.ping().await?;
        info!(
            hosts = %sink.config.hosts.join(","),
            topic = %sink.config.topic,
            required_acks = sink.config.required_acks,
            "Connected to log broker"
        );
        Ok(sink)
    }

    /// Derives the message (partition) key from something other than the entry key.
    pub fn with_key_extractor(mut self, key_extractor: KeyExtractor<V>) -> Self {
        self.key_extractor = key_extractor;
        self
    }

    fn message(&self, entry: &Entry<V>) -> Result<Message, EntryError> {
        let value = (self.serializer)(entry).map_err(EntryError::from_backend)?;
        Ok(Message {
            key: (self.key_extractor)(entry).into_bytes(),
            value,
        })
    }

    /// Writes `messages`, or hands them to a background task when
    /// `async_writes` is set.
    async fn send(&self, messages: Vec<Message>) -> Result<(), BrokerError> {
        if self.config.async_writes {
            let writer = Arc::clone(&self.writer);
            let retry = self.retry;
            let write_timeout = self.config.write_timeout();
            let topic = self.config.topic.clone();
            tokio::spawn(async move {
                if let Err(err) = produce(writer.as_ref(), retry, write_timeout, &messages).await {
                    warn!(topic = %topic, messages = messages.len(), error = %err, "Async produce failed");
                }
            });
            return Ok(());
        }
        produce(self.writer.as_ref(), self.retry, self.config.write_timeout(), &messages).await
    }
}

#[async_trait]
impl<W, V> Sink<V> for LogBrokerSink<W, V>
where
    W: LogWriter,
    V: Send + Sync + 'static,
{
    async fn single(&self, entry: Entry<V>) -> SinkResult<()> {
        let message = self.message(&entry).map_err(|source| SinkError::Write {
            key: entry.key.clone(),
            source,
        })?;
        self.send(vec![message]).await.map_err(|err| SinkError::Write {
            key: entry.key,
            source: EntryError::from_backend(Box::new(err)),
        })
    }

    async fn batch(&self, entries: Vec<Entry<V>>) -> SinkResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut errors = BatchError::new();
        let mut keys = Vec::with_capacity(entries.len());
        let mut messages = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.message(entry) {
                Ok(message) => {
                    keys.push(entry.key.clone());
                    messages.push(message);
                }
                Err(err) => errors.add(entry.key.clone(), err),
            }
        }

        if !messages.is_empty() {
            if let Err(err) = self.send(messages).await {
                // The broker call is all-or-nothing, so every key shares the failure.
                let failure = EntryError::from_backend(Box::new(err));
                for key in keys {
                    errors.add(key, failure.clone());
                }
            } else {
                debug!(topic = %self.config.topic, messages = keys.len(), "Batch produced");
            }
        }

        errors.into_result()?;
        Ok(())
    }

    async fn ping(&self) -> SinkResult<()> {
        let brokers = self
            .writer
            .brokers()
            .await
            .map_err(|err| SinkError::Unreachable(err.to_string()))?;
        if brokers.is_empty() {
            return Err(SinkError::Unreachable(
                "failed to get a valid list of brokers".to_string(),
            ));
        }
        Ok(())
    }
}
