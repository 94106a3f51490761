//! Delivered-but-uncommitted cursors, addressed by entry key.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Maps each delivered entry key to the backend cursor needed to commit it.
///
/// A key is present from delivery until it is committed. Re-delivering a key
/// replaces its cursor.
#[derive(Debug)]
pub struct CommitTracker<C> {
    pending: Mutex<HashMap<String, C>>,
}

impl<C> Default for CommitTracker<C> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<C> CommitTracker<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_deliver(&self, key: impl Into<String>, cursor: C) {
        self.pending.lock().insert(key.into(), cursor);
    }

    /// Removes and returns the cursors of `keys`, in request order.
    ///
    /// Unknown keys are skipped. Lookup and removal happen under one lock, so
    /// two concurrent callers never both receive the same cursor.
    pub fn take(&self, keys: &[String]) -> Vec<C> {
        let mut pending = self.pending.lock();
        keys.iter().filter_map(|key| pending.remove(key)).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
