//! Concurrent write dispatch and bounded result collection.

use crate::{RetryPolicy, TimeoutBudget};
use async_trait::async_trait;
use relay_core::{
    entry_key, BatchError, BoxError, CoordinatorSettings, Entry, EntryError, KeyExtractor, Outcome,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn, Instrument, Span};

/// One backend write attempt for one entry.
///
/// The coordinator owns retries and deadlines; implementations make exactly
/// one call to the backend and report its error.
#[async_trait]
pub trait EntryWriter<V>: Send + Sync + 'static {
    async fn write(&self, entry: &Entry<V>) -> Result<(), BoxError>;
}

/// How the join phase bounds its wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// The budget is re-armed after every received result, so a batch of N
    /// may take up to N budgets in the worst case.
    #[default]
    PerResult,
    /// One deadline for the whole batch.
    SharedDeadline,
}

/// Tuning for a [`WriteCoordinator`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub retry: RetryPolicy,
    /// Per-attempt timeout; only feeds the budget computation here.
    pub timeout: Duration,
    pub budget_override: Option<Duration>,
    pub join_mode: JoinMode,
    pub group_by_key: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig::from(&CoordinatorSettings::default())
    }
}

impl From<&CoordinatorSettings> for CoordinatorConfig {
    fn from(settings: &CoordinatorSettings) -> Self {
        Self {
            retry: RetryPolicy::new(settings.max_retries, settings.retry_timeout()),
            timeout: settings.timeout(),
            budget_override: settings.budget_override(),
            join_mode: if settings.shared_deadline {
                JoinMode::SharedDeadline
            } else {
                JoinMode::PerResult
            },
            group_by_key: settings.group_by_key,
        }
    }
}

impl CoordinatorConfig {
    pub fn budget(&self) -> TimeoutBudget {
        match self.budget_override {
            Some(budget) => TimeoutBudget::fixed(budget),
            None => TimeoutBudget::compute(
                self.timeout,
                self.retry.retry_timeout,
                self.retry.max_retries,
            ),
        }
    }
}

/// Dispatches writes concurrently through an [`EntryWriter`] and collects
/// one outcome per submitted key.
pub struct WriteCoordinator<V> {
    writer: Arc<dyn EntryWriter<V>>,
    retry: RetryPolicy,
    budget: Duration,
    join_mode: JoinMode,
    group_key: Option<KeyExtractor<V>>,
    span: Span,
}

impl<V> WriteCoordinator<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(config: CoordinatorConfig, writer: Arc<dyn EntryWriter<V>>) -> Self {
        let group_key = config.group_by_key.then(entry_key::<V>);
        Self {
            writer,
            retry: config.retry,
            budget: config.budget().duration(),
            join_mode: config.join_mode,
            group_key,
            span: tracing::debug_span!("write_coordinator"),
        }
    }

    /// Groups entries by `extractor` instead of the entry key. Entries that
    /// share a group are written sequentially in submission order.
    pub fn with_group_key(mut self, extractor: KeyExtractor<V>) -> Self {
        self.group_key = Some(extractor);
        self
    }

    /// Span that writer tasks and join diagnostics are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_grouped(&self) -> bool {
        self.group_key.is_some()
    }

    /// Writes one entry with retries, waiting at most one budget.
    pub async fn write_single(&self, entry: Entry<V>) -> Result<(), EntryError> {
        let key = entry.key.clone();
        let writer = Arc::clone(&self.writer);
        let retry = self.retry;

        let mut handle = tokio::spawn(
            async move { write_with_retries(writer.as_ref(), retry, &entry).await }
                .instrument(self.span.clone()),
        );

        match timeout(self.budget, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EntryError::rejected(format!(
                "writer task failed: {}",
                join_err
            ))),
            Err(_) => {
                handle.abort();
                self.span.in_scope(|| {
                    warn!(key = %key, budget_ms = self.budget.as_millis() as u64, "Single write timed out");
                });
                Err(EntryError::timeout(self.budget))
            }
        }
    }

    /// Writes a batch concurrently and reports every failing key.
    ///
    /// Keys that produced no result within the join bound are reported as
    /// [`EntryError::Timeout`]. Writers still running when this returns are
    /// aborted.
    pub async fn write_batch(&self, entries: Vec<Entry<V>>) -> Result<(), BatchError> {
        if entries.is_empty() {
            return Ok(());
        }
        let span = self.span.clone();
        self.dispatch_and_join(entries).instrument(span).await
    }

    async fn dispatch_and_join(&self, entries: Vec<Entry<V>>) -> Result<(), BatchError> {
        let submitted: Vec<String> = entries.iter().map(|entry| entry.key.clone()).collect();
        let (tx, rx) = mpsc::channel::<Outcome>(submitted.len());
        let mut tasks = JoinSet::new();

        match &self.group_key {
            Some(extractor) => {
                let groups = partition_by_key(entries, extractor);
                debug!(entries = submitted.len(), groups = groups.len(), "Dispatching grouped batch");
                for group in groups {
                    let tx = tx.clone();
                    let writer = Arc::clone(&self.writer);
                    let retry = self.retry;
                    tasks.spawn(
                        async move {
                            for entry in group {
                                let outcome = outcome_of(writer.as_ref(), retry, entry).await;
                                if tx.send(outcome).await.is_err() {
                                    break;
                                }
                            }
                        }
                        .in_current_span(),
                    );
                }
            }
            None => {
                debug!(entries = submitted.len(), "Dispatching batch");
                for entry in entries {
                    let tx = tx.clone();
                    let writer = Arc::clone(&self.writer);
                    let retry = self.retry;
                    tasks.spawn(
                        async move {
                            let outcome = outcome_of(writer.as_ref(), retry, entry).await;
                            let _ = tx.send(outcome).await;
                        }
                        .in_current_span(),
                    );
                }
            }
        }
        // Only the writers hold senders now; the channel closes once all finish.
        drop(tx);

        debug!(budget_ms = self.budget.as_millis() as u64, mode = ?self.join_mode, "Joining batch results");
        let errors = self.join(rx, &submitted).await;
        tasks.abort_all();

        debug!(
            entries = submitted.len(),
            failed = errors.len(),
            timed_out = errors.timeout_count(),
            "Batch joined"
        );
        errors.into_result()
    }

    /// Receives up to one outcome per submitted entry, then reconciles.
    ///
    /// Keys may repeat within a batch, so pending writes are counted per key.
    async fn join(&self, mut rx: mpsc::Receiver<Outcome>, submitted: &[String]) -> BatchError {
        let mut pending: HashMap<&str, usize> = HashMap::with_capacity(submitted.len());
        for key in submitted {
            *pending.entry(key.as_str()).or_insert(0) += 1;
        }
        let mut received = 0usize;
        let mut errors = BatchError::new();
        let deadline = Instant::now() + self.budget;

        for _ in 0..submitted.len() {
            let next = match self.join_mode {
                JoinMode::PerResult => timeout(self.budget, rx.recv()).await,
                JoinMode::SharedDeadline => timeout_at(deadline, rx.recv()).await,
            };

            match next {
                Ok(Some(outcome)) => {
                    received += 1;
                    if let Some(count) = pending.get_mut(outcome.key.as_str()) {
                        *count = count.saturating_sub(1);
                    }
                    errors.add_outcome(outcome);
                }
                // Every writer has finished or gone away.
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        budget_ms = self.budget.as_millis() as u64,
                        received,
                        expected = submitted.len(),
                        "Timed out waiting for write result"
                    );
                    if self.join_mode == JoinMode::SharedDeadline {
                        break;
                    }
                }
            }
        }

        // A rejection already recorded for the key is kept over the timeout.
        for key in submitted {
            let unreported = pending.get(key.as_str()).is_some_and(|count| *count > 0);
            if unreported && !errors.contains(key) {
                errors.add(key.clone(), EntryError::timeout(self.budget));
            }
        }
        errors
    }
}

async fn write_with_retries<V>(
    writer: &dyn EntryWriter<V>,
    retry: RetryPolicy,
    entry: &Entry<V>,
) -> Result<(), EntryError>
where
    V: Send + Sync + 'static,
{
    retry
        .execute(|| writer.write(entry))
        .await
        .map_err(EntryError::from_backend)
}

async fn outcome_of<V>(writer: &dyn EntryWriter<V>, retry: RetryPolicy, entry: Entry<V>) -> Outcome
where
    V: Send + Sync + 'static,
{
    match write_with_retries(writer, retry, &entry).await {
        Ok(()) => Outcome::success(entry.key),
        Err(err) => Outcome::failure(entry.key, err),
    }
}

/// Splits entries into groups by derived key, preserving first-appearance
/// order of groups and submission order within each group.
fn partition_by_key<V>(entries: Vec<Entry<V>>, extractor: &KeyExtractor<V>) -> Vec<Vec<Entry<V>>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<Entry<V>>> = Vec::new();

    for entry in entries {
        let group = extractor(&entry);
        match index.get(&group) {
            Some(&idx) => groups[idx].push(entry),
            None => {
                index.insert(group, groups.len());
                groups.push(vec![entry]);
            }
        }
    }
    groups
}
