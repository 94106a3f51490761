//! [`Source`] polling one HTTP request on a fixed interval.

use crate::sink::execute;
use crate::HttpSourceConfig;
use async_trait::async_trait;
use relay_core::{Entry, Source, SourceError, SourceResult};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

/// Builds the polled request from the shared client.
pub type PollRequestFactory = Arc<dyn Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync>;

/// Emits each successful response body as one entry keyed
/// `"{path}-{unix-seconds}"`.
///
/// Polls carry no cursor, so [`Source::commit_entry`] has nothing to forward.
pub struct HttpPollingSource {
    name: String,
    config: HttpSourceConfig,
    client: reqwest::Client,
    factory: PollRequestFactory,
    stop_tx: watch::Sender<bool>,
}

fn unix_now() -> std::time::Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

fn entry_key(url: &reqwest::Url) -> String {
    let uri = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    format!("{}-{}", uri, unix_now().as_secs())
}

impl HttpPollingSource {
    pub fn new(config: HttpSourceConfig, factory: PollRequestFactory) -> SourceResult<Self> {
        if config.poll_interval_ms == 0 {
            return Err(SourceError::Config("poll interval must be positive".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| SourceError::Config(format!("failed to build HTTP client: {}", err)))?;
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            name: format!("{}-{}", config.name_prefix, unix_now().as_nanos()),
            config,
            client,
            factory,
            stop_tx,
        })
    }

    /// Output channel sized by `queue_capacity`.
    pub fn channel(&self) -> (mpsc::Sender<Entry<Vec<u8>>>, mpsc::Receiver<Entry<Vec<u8>>>) {
        mpsc::channel(self.config.queue_capacity)
    }

    async fn poll(&self) -> Result<Entry<Vec<u8>>, SourceError> {
        let fetch_err = |err: crate::HttpSinkError| SourceError::Fetch(err.to_string());
        let response = execute(&self.client, (self.factory)(&self.client))
            .await
            .map_err(fetch_err)?;
        let key = entry_key(response.url());
        let body = response
            .bytes()
            .await
            .map_err(|err| fetch_err(err.into()))?;
        Ok(Entry::new(key, body.to_vec()))
    }

    async fn run(&self, output: &mpsc::Sender<Entry<Vec<u8>>>, errors: &mpsc::Sender<SourceError>) {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop_rx.borrow_and_update() {
                return;
            }
            tokio::select! {
                biased;
                _ = stop_rx.changed() => return,
                _ = ticker.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = stop_rx.changed() => return,
                polled = self.poll() => polled,
            };

            match polled {
                Ok(entry) => {
                    debug!(key = %entry.key, bytes = entry.value.len(), "Polled entry");
                    tokio::select! {
                        biased;
                        _ = stop_rx.changed() => return,
                        sent = output.send(entry) => {
                            if sent.is_err() {
                                warn!("Output channel closed, stopping source");
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Poll failed");
                    tokio::select! {
                        biased;
                        _ = stop_rx.changed() => return,
                        _ = errors.send(err) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Source<Vec<u8>> for HttpPollingSource {
    async fn start(&self, output: mpsc::Sender<Entry<Vec<u8>>>, errors: mpsc::Sender<SourceError>) {
        self.stop_tx.send_replace(false);
        let span = info_span!("http_polling_source", name = %self.name);
        async move {
            info!(interval_ms = self.config.poll_interval_ms, "Source started");
            self.run(&output, &errors).await;
            info!("Source stopped");
            drop(output);

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
        debug!(name = %self.name, keys = keys.len(), "Nothing to commit for polled entries");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
