//! [`Sink`] over a [`DocumentStore`].

use crate::{
    DocumentSinkConfig, DocumentStore, Extractors, QueryOptions, StoreError, WriteMethod, WriteOptions,
};
use async_trait::async_trait;
use relay_core::{BoxError, Entry, Sink, SinkError, SinkResult};
use retriable_write_coordinator::{CoordinatorConfig, EntryWriter, WriteCoordinator};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span};

/// One write attempt for one entry, dispatched on the configured method.
struct DocumentWriter<S> {
    store: Arc<S>,
    method: WriteMethod,
    query: Option<String>,
    query_options: QueryOptions,
    timeout: Duration,
    extractors: Extractors,
}

impl<S: DocumentStore> DocumentWriter<S> {
    async fn mutate_or_insert(&self, id: &str, entry: &Entry<Value>, options: &WriteOptions) -> Result<(), BoxError> {
        let extractor = self
            .extractors
            .mutate_ops
            .as_ref()
            .ok_or_else(|| StoreError::InvalidDocument("no mutate-ops extractor configured".to_string()))?;
        let (specs, document) = extractor(entry)
            .map_err(|err| format!("failed to extract ops during mutation: {}", err))?;

        match self.store.mutate_in(id, &specs, self.timeout).await {
            Err(StoreError::DocumentNotFound(_)) => {
                debug!(id = %id, "Document missing, inserting instead of mutating");
                self.store.insert(id, &document, options).await?;
                Ok(())
            }
            other => Ok(other?),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> EntryWriter<Value> for DocumentWriter<S> {
    async fn write(&self, entry: &Entry<Value>) -> Result<(), BoxError> {
        let id = (self.extractors.key)(entry);
        let options = WriteOptions {
            expiry: (self.extractors.expiry)(entry),
            timeout: self.timeout,
        };

        match self.method {
            WriteMethod::Ignore => self.store.insert(&id, &entry.value, &options).await?,
            WriteMethod::Upsert => self.store.upsert(&id, &entry.value, &options).await?,
            WriteMethod::Replace => self.store.replace(&id, &entry.value, &options).await?,
            WriteMethod::Query => {
                let statement = self
                    .query
                    .as_deref()
                    .ok_or_else(|| StoreError::InvalidDocument("no query statement configured".to_string()))?;
                let params = entry.value.as_object().ok_or_else(|| {
                    StoreError::InvalidDocument(format!(
                        "query parameters for {} must be a JSON object",
                        entry.key
                    ))
                })?;
                self.store.query(statement, params, &self.query_options).await?
            }
            WriteMethod::MutateOrInsert => self.mutate_or_insert(&id, entry, &options).await?,
        }
        Ok(())
    }
}

/// Writes JSON entries to a document-store bucket.
pub struct DocumentSink<S> {
    store: Arc<S>,
    config: DocumentSinkConfig,
    coordinator: WriteCoordinator<Value>,
}

impl<S: DocumentStore> DocumentSink<S> {
    /// Validates `config`, wires the writer and checks that every configured
    /// service answers a ping.
    pub async fn connect(config: DocumentSinkConfig, extractors: Extractors, store: Arc<S>) -> SinkResult<Self> {
        config.validate(&extractors)?;

        let writer = DocumentWriter {
            store: Arc::clone(&store),
            method: config.write_method,
            query: config.query.clone(),
            query_options: QueryOptions {
                scan_consistency: config.scan_consistency,
                adhoc: config.adhoc,
                timeout: config.timeout(),
            },
            timeout: config.timeout(),
            extractors: extractors.clone(),
        };

        let mut coordinator = WriteCoordinator::<Value>::new(
            CoordinatorConfig::from(&config.coordinator_settings()),
            Arc::new(writer),
        )
        .with_span(info_span!("document_sink", bucket = %config.bucket, method = %config.write_method));
        if config.group_by_key {
            coordinator = coordinator.with_group_key(extractors.key);
        }

        let sink = Self {
            store,
            config,
            coordinator,
        };
        sink.ping().await?;
        info!(
            bucket = %sink.config.bucket,
            method = %sink.config.write_method,
            budget_ms = sink.coordinator.budget().as_millis() as u64,
            "Document sink connected"
        );
        Ok(sink)
    }

    pub fn config(&self) -> &DocumentSinkConfig {
        &self.config
    }
}

#[async_trait]
impl<S: DocumentStore> Sink<Value> for DocumentSink<S> {
    async fn single(&self, entry: Entry<Value>) -> SinkResult<()> {
        let key = entry.key.clone();
        self.coordinator
            .write_single(entry)
            .await
            .map_err(|source| SinkError::Write { key, source })
    }

    async fn batch(&self, entries: Vec<Entry<Value>>) -> SinkResult<()> {
        self.coordinator.write_batch(entries).await?;
        Ok(())
    }

    async fn ping(&self) -> SinkResult<()> {
        let report = self
            .store
            .ping(&self.config.services)
            .await
            .map_err(|err| SinkError::Unreachable(err.to_string()))?;

        match report.first_failure() {
            Some(failed) => Err(SinkError::Unreachable(format!(
                "failed to ping {:?} service at {}: {}",
                failed.service,
                failed.endpoint,
                failed.error.as_deref().unwrap_or("no error reported")
            ))),
            None => Ok(()),
        }
    }
}
