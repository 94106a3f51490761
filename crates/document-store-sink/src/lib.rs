//! Document-store sink.
//!
//! Writes `serde_json::Value` entries as documents through a
//! [`DocumentStore`] client, using one of five [`WriteMethod`]s. Retries,
//! timeouts and per-key error reporting come from the write coordinator.

mod config;
mod sink;
mod store;

pub use config::{
    map_element_key, no_expiry, DocumentSinkConfig, ExpiryExtractor, Extractors,
    MutateOpsExtractor, ScanConsistency, ServiceType, WriteMethod,
};
pub use sink::DocumentSink;
pub use store::{
    DocumentStore, MutateSpec, PingReport, PingState, QueryOptions, ServicePing, StoreError,
    WriteOptions,
};
