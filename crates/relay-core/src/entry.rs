//! The unit of data and the unit of result.

use crate::EntryError;
use std::sync::Arc;

/// A keyed record flowing through the relay.
///
/// The key is assigned by the producer and is not required to be unique
/// within a batch. The value is opaque to the write path; only the backend
/// adapter knows its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<V> {
    pub key: String,
    pub value: V,
}

impl<V> Entry<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Result of writing one entry, reported exactly once per submitted entry.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub key: String,
    pub result: Result<(), EntryError>,
}

impl Outcome {
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            result: Ok(()),
        }
    }

    pub fn failure(key: impl Into<String>, error: EntryError) -> Self {
        Self {
            key: key.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Derives the backend key (document id, partition key, group key) of an entry.
pub type KeyExtractor<V> = Arc<dyn Fn(&Entry<V>) -> String + Send + Sync>;

/// Key extractor that uses the entry key as-is.
pub fn entry_key<V>() -> KeyExtractor<V> {
    Arc::new(|entry: &Entry<V>| entry.key.clone())
}
