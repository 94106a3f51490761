//! Document sink settings and per-entry extractors.

use crate::MutateSpec;
use relay_core::{entry_key, BoxError, CoordinatorSettings, Entry, KeyExtractor, SinkError, SinkResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How each entry is written. Serialised as its numeric selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum WriteMethod {
    /// Insert; an existing document is left alone and the write fails.
    Ignore = 1,
    Upsert = 2,
    /// Replace; fails if the document does not exist.
    Replace = 3,
    /// Run the configured query with the entry value as named parameters.
    Query = 4,
    /// Apply sub-document mutations, inserting a fresh document if missing.
    MutateOrInsert = 5,
}

impl TryFrom<i32> for WriteMethod {
    type Error = SinkError;

    fn try_from(selector: i32) -> SinkResult<Self> {
        match selector {
            1 => Ok(WriteMethod::Ignore),
            2 => Ok(WriteMethod::Upsert),
            3 => Ok(WriteMethod::Replace),
            4 => Ok(WriteMethod::Query),
            5 => Ok(WriteMethod::MutateOrInsert),
            other => Err(SinkError::Config(format!(
                "unsupported write method: {}, should be one of IGNORE(1), UPSERT(2), REPLACE(3), QUERY(4) or MUTATE_OR_INSERT(5)",
                other
            ))),
        }
    }
}

impl From<WriteMethod> for i32 {
    fn from(method: WriteMethod) -> Self {
        method as i32
    }
}

impl FromStr for WriteMethod {
    type Err = SinkError;

    fn from_str(s: &str) -> SinkResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(WriteMethod::Ignore),
            "upsert" => Ok(WriteMethod::Upsert),
            "replace" => Ok(WriteMethod::Replace),
            "query" => Ok(WriteMethod::Query),
            "mutate_or_insert" => Ok(WriteMethod::MutateOrInsert),
            other => match other.parse::<i32>() {
                Ok(selector) => WriteMethod::try_from(selector),
                Err(_) => Err(SinkError::Config(format!("unsupported write method: {}", s))),
            },
        }
    }
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteMethod::Ignore => "ignore",
            WriteMethod::Upsert => "upsert",
            WriteMethod::Replace => "replace",
            WriteMethod::Query => "query",
            WriteMethod::MutateOrInsert => "mutate_or_insert",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanConsistency {
    NotBounded,
    RequestPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    KeyValue,
    Query,
    Search,
    Analytics,
    Management,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSinkConfig {
    /// Connection string, e.g. `couchbase://10.0.0.1,10.0.0.2`.
    pub hosts: String,
    pub username: String,
    pub password: String,
    pub bucket_password: String,
    pub bucket: String,
    /// Statement for [`WriteMethod::Query`].
    pub query: Option<String>,
    pub scan_consistency: ScanConsistency,
    pub adhoc: bool,
    pub group_by_key: bool,
    pub max_retries: u32,
    pub retry_timeout_ms: u64,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Services that must answer a ping.
    pub services: Vec<ServiceType>,
    pub write_method: WriteMethod,
}

impl Default for DocumentSinkConfig {
    fn default() -> Self {
        Self {
            hosts: String::new(),
            username: String::new(),
            password: String::new(),
            bucket_password: String::new(),
            bucket: String::new(),
            query: None,
            scan_consistency: ScanConsistency::RequestPlus,
            adhoc: true,
            group_by_key: false,
            max_retries: 5,
            retry_timeout_ms: 10,
            timeout_ms: 1000,
            services: vec![ServiceType::Query, ServiceType::KeyValue],
            write_method: WriteMethod::Upsert,
        }
    }
}

impl DocumentSinkConfig {
    pub fn new(
        hosts: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        bucket_password: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            hosts: hosts.into(),
            username: username.into(),
            password: password.into(),
            bucket_password: bucket_password.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Coordinator settings derived from this sink's retry configuration.
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            max_retries: self.max_retries,
            retry_timeout_ms: self.retry_timeout_ms,
            timeout_ms: self.timeout_ms,
            group_by_key: self.group_by_key,
            ..Default::default()
        }
    }

    /// Checks that the write method has what it needs.
    pub fn validate(&self, extractors: &Extractors) -> SinkResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(SinkError::Config("bucket must not be empty".to_string()));
        }
        match self.write_method {
            WriteMethod::Query if self.query.as_deref().map_or(true, |q| q.trim().is_empty()) => Err(
                SinkError::Config("write method query requires a query statement".to_string()),
            ),
            WriteMethod::MutateOrInsert if extractors.mutate_ops.is_none() => Err(SinkError::Config(
                "write method mutate_or_insert requires a mutate-ops extractor".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Document expiry for an entry; `None` means no expiry.
pub type ExpiryExtractor = Arc<dyn Fn(&Entry<Value>) -> Option<Duration> + Send + Sync>;

/// Sub-document mutations for an entry plus the document to insert when the
/// target does not exist yet.
pub type MutateOpsExtractor =
    Arc<dyn Fn(&Entry<Value>) -> Result<(Vec<MutateSpec>, Value), BoxError> + Send + Sync>;

pub fn no_expiry() -> ExpiryExtractor {
    Arc::new(|_: &Entry<Value>| -> Option<Duration> { None })
}

/// Uses the string field `element` of an object value as the document key.
///
/// Falls back to the entry key when the field is missing or not a string.
pub fn map_element_key(element: impl Into<String>) -> KeyExtractor<Value> {
    let element = element.into();
    Arc::new(move |entry: &Entry<Value>| match entry.value.get(&element).and_then(Value::as_str) {
        Some(key) => key.to_string(),
        None => {
            warn!(key = %entry.key, element = %element, "Document key element missing, using entry key");
            entry.key.clone()
        }
    })
}

/// Per-entry derivations used by the document writer.
#[derive(Clone)]
pub struct Extractors {
    pub key: KeyExtractor<Value>,
    pub expiry: ExpiryExtractor,
    pub mutate_ops: Option<MutateOpsExtractor>,
}

impl Default for Extractors {
    fn default() -> Self {
        Self {
            key: entry_key(),
            expiry: no_expiry(),
            mutate_ops: None,
        }
    }
}

impl Extractors {
    pub fn with_key(mut self, key: KeyExtractor<Value>) -> Self {
        self.key = key;
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryExtractor) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_mutate_ops(mut self, mutate_ops: MutateOpsExtractor) -> Self {
        self.mutate_ops = Some(mutate_ops);
        self
    }
}
