//! [`Sink`] inserting [`Record`] rows through a [`SqlConnection`].

use crate::{gen_insert_query, ColumnarConfig, Record, RecordMapping, SqlConnection, SqlError};
use async_trait::async_trait;
use relay_core::{BatchError, Entry, EntryError, Sink, SinkError, SinkResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ColumnarSink<C> {
    connection: Arc<C>,
    config: ColumnarConfig,
    table: String,
    mapping: RecordMapping,
    query: String,
}

fn entry_error(err: SqlError) -> EntryError {
    EntryError::from_backend(Box::new(err))
}

impl<C: SqlConnection> ColumnarSink<C> {
    /// Builds the insert statement and checks the connection is alive.
    pub async fn connect(
        config: ColumnarConfig,
        table: impl Into<String>,
        mapping: RecordMapping,
        connection: Arc<C>,
    ) -> SinkResult<Self> {
        // Fails early on a config without hosts.
        config.connection_string()?;
        let table = table.into();
        if mapping.is_empty() {
            return Err(SinkError::Config(format!("no columns mapped for table {}", table)));
        }

        info!(target_db = %config.describe(), table = %table, "Connecting to columnar database");
        let sink = Self {
            connection,
            query: gen_insert_query(&table, &mapping),
            config,
            table,
            mapping,
        };
        sink.ping().await?;
        info!(target_db = %sink.config.describe(), table = %sink.table, "Connected to columnar database");
        Ok(sink)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn check_arity(&self, row: &Record) -> Result<(), EntryError> {
        if row.len() == self.mapping.len() {
            Ok(())
        } else {
            Err(EntryError::rejected(format!(
                "row has {} values but {} columns are mapped",
                row.len(),
                self.mapping.len()
            )))
        }
    }
}

#[async_trait]
impl<C: SqlConnection> Sink<Record> for ColumnarSink<C> {
    async fn single(&self, entry: Entry<Record>) -> SinkResult<()> {
        warn!(table = %self.table, "Single-row inserts are inefficient here, consider batching upstream");
        let key = entry.key;
        let write = async {
            self.check_arity(&entry.value)?;
            let mut tx = self.connection.begin().await.map_err(entry_error)?;
            tx.exec(&self.query, &entry.value).await.map_err(entry_error)?;
            tx.commit().await.map_err(entry_error)
        };
        write.await.map_err(|source| SinkError::Write { key, source })
    }

    async fn batch(&self, entries: Vec<Entry<Record>>) -> SinkResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = match self.connection.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                let failure = entry_error(err);
                let mut errors = BatchError::new();
                for entry in &entries {
                    errors.add(entry.key.clone(), failure.clone());
                }
                return Err(errors.into());
            }
        };

        let mut errors = BatchError::new();
        for entry in &entries {
            let result = match self.check_arity(&entry.value) {
                Ok(()) => tx.exec(&self.query, &entry.value).await.map_err(entry_error),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                errors.add(entry.key.clone(), err);
            }
        }

        if !errors.is_empty() {
            warn!(table = %self.table, failed = errors.len(), rows = entries.len(), "Batch rejected, rolling back");
            drop(tx);
            return Err(errors.into());
        }

        if let Err(err) = tx.commit().await {
            let failure = entry_error(err);
            for entry in &entries {
                errors.add(entry.key.clone(), failure.clone());
            }
            return Err(errors.into());
        }
        debug!(table = %self.table, rows = entries.len(), "Batch committed");
        Ok(())
    }

    async fn ping(&self) -> SinkResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|err| SinkError::Unreachable(err.to_string()))
    }
}
