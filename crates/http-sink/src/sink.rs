//! [`Sink`] issuing one HTTP request per entry.

use crate::HttpSinkConfig;
use async_trait::async_trait;
use relay_core::{BoxError, Entry, Sink, SinkError, SinkResult};
use retriable_write_coordinator::{CoordinatorConfig, EntryWriter, WriteCoordinator};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info_span};

/// Builds the request for an entry from the shared client.
pub type RequestFactory<V> =
    Arc<dyn Fn(&reqwest::Client, &Entry<V>) -> reqwest::RequestBuilder + Send + Sync>;

#[derive(Debug, Error)]
pub enum HttpSinkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{method} request to {url} returned error code: {status}")]
    Status {
        method: reqwest::Method,
        url: reqwest::Url,
        status: u16,
    },
}

struct HttpWriter<V> {
    client: reqwest::Client,
    factory: RequestFactory<V>,
}

#[async_trait]
impl<V> EntryWriter<V> for HttpWriter<V>
where
    V: Send + Sync + 'static,
{
    async fn write(&self, entry: &Entry<V>) -> Result<(), BoxError> {
        let request = (self.factory)(&self.client, entry);
        let response = execute(&self.client, request).await?;
        debug!(key = %entry.key, url = %response.url(), status = response.status().as_u16(), "Request delivered");
        Ok(())
    }
}

/// Sends `request`, treating statuses of 400 and above as failures.
pub(crate) async fn execute(
    client: &reqwest::Client,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, HttpSinkError> {
    let request = request.build()?;
    let method = request.method().clone();
    let url = request.url().clone();

    let response = client.execute(request).await?;
    let status = response.status().as_u16();
    if status >= 400 {
        return Err(HttpSinkError::Status { method, url, status });
    }
    Ok(response)
}

pub struct HttpSink<V> {
    coordinator: WriteCoordinator<V>,
}

impl<V> HttpSink<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(config: HttpSinkConfig, factory: RequestFactory<V>) -> SinkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| SinkError::Config(format!("failed to build HTTP client: {}", err)))?;
        let writer: Arc<dyn EntryWriter<V>> = Arc::new(HttpWriter { client, factory });

        let coordinator = WriteCoordinator::new(CoordinatorConfig::from(&config.coordinator_settings()), writer)
            .with_span(info_span!("http_sink"));
        Ok(Self { coordinator })
    }
}

#[async_trait]
impl<V> Sink<V> for HttpSink<V>
where
    V: Send + Sync + 'static,
{
    async fn single(&self, entry: Entry<V>) -> SinkResult<()> {
        let key = entry.key.clone();
        self.coordinator
            .write_single(entry)
            .await
            .map_err(|source| SinkError::Write { key, source })
    }

    async fn batch(&self, entries: Vec<Entry<V>>) -> SinkResult<()> {
        self.coordinator.write_batch(entries).await?;
        Ok(())
    }

    async fn ping(&self) -> SinkResult<()> {
        Ok(())
    }
}
