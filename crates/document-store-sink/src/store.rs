//! Client contract for the document store.

use crate::{ScanConsistency, ServiceType};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("document already exists: {0}")]
    DocumentExists(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Backend(String),
}

/// Options for key-value writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// `None` keeps the document forever.
    pub expiry: Option<Duration>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub scan_consistency: ScanConsistency,
    pub adhoc: bool,
    pub timeout: Duration,
}

/// One sub-document operation of a mutate-in call.
#[derive(Debug, Clone, PartialEq)]
pub enum MutateSpec {
    Insert { path: String, value: Value },
    Upsert { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
    ArrayAppend { path: String, value: Value },
    Increment { path: String, delta: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    Ok,
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServicePing {
    pub service: ServiceType,
    pub endpoint: String,
    pub state: PingState,
    pub error: Option<String>,
}

/// Per-endpoint results of a ping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingReport {
    pub services: Vec<ServicePing>,
}

impl PingReport {
    /// The first endpoint that did not answer OK.
    pub fn first_failure(&self) -> Option<&ServicePing> {
        self.services.iter().find(|ping| ping.state != PingState::Ok)
    }
}

/// A connected document-store client scoped to one bucket.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Creates a document; fails with [`StoreError::DocumentExists`] if the id is taken.
    async fn insert(&self, id: &str, doc: &Value, options: &WriteOptions) -> Result<(), StoreError>;

    async fn upsert(&self, id: &str, doc: &Value, options: &WriteOptions) -> Result<(), StoreError>;

    /// Overwrites an existing document; fails with [`StoreError::DocumentNotFound`] otherwise.
    async fn replace(&self, id: &str, doc: &Value, options: &WriteOptions) -> Result<(), StoreError>;

    /// Runs `statement` with named parameters.
    async fn query(
        &self,
        statement: &str,
        params: &Map<String, Value>,
        options: &QueryOptions,
    ) -> Result<(), StoreError>;

    async fn mutate_in(&self, id: &str, specs: &[MutateSpec], timeout: Duration) -> Result<(), StoreError>;

    async fn ping(&self, services: &[ServiceType]) -> Result<PingReport, StoreError>;
}
