//! Aggregation of per-key failures into one reportable error.

use crate::{EntryError, Outcome};
use std::collections::BTreeMap;
use std::fmt;

/// Per-key failures of one batch.
///
/// Presence of a key means that key failed; successes are never stored. If
/// the same key is reported twice the last failure wins. Keys are kept
/// sorted so the rendered message is stable.
#[derive(Debug, Clone, Default)]
pub struct BatchError {
    errors: BTreeMap<String, EntryError>,
}

impl BatchError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `key`.
    pub fn add(&mut self, key: impl Into<String>, error: EntryError) {
        self.errors.insert(key.into(), error);
    }

    /// Records the outcome of one write; successful outcomes are ignored.
    pub fn add_outcome(&mut self, outcome: Outcome) {
        if let Err(error) = outcome.result {
            self.add(outcome.key, error);
        }
    }

    /// `Ok(())` if nothing failed, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), BatchError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn get(&self, key: &str) -> Option<&EntryError> {
        self.errors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryError)> {
        self.errors.iter().map(|(key, err)| (key.as_str(), err))
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failures that were synthesized because no result arrived.
    pub fn timeout_count(&self) -> usize {
        self.errors.values().filter(|err| err.is_timeout()).count()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch write failed for {} key(s)", self.errors.len())?;
        for (idx, (key, err)) in self.errors.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{}[{}] {}", sep, key, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

impl IntoIterator for BatchError {
    type Item = (String, EntryError);
    type IntoIter = std::collections::btree_map::IntoIter<String, EntryError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_aggregate_is_ok() {
        let errors = BatchError::new();
        assert!(errors.is_empty());
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn successes_are_not_recorded() {
        let mut errors = BatchError::new();
        errors.add_outcome(Outcome::success("a"));
        errors.add_outcome(Outcome::success("b"));
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn failures_are_recorded_by_key() {
        let mut errors = BatchError::new();
        errors.add_outcome(Outcome::success("a"));
        errors.add_outcome(Outcome::failure("b", EntryError::rejected("b failed")));
        errors.add("c", EntryError::timeout(Duration::from_millis(5)));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(!err.contains("a"));
        assert_eq!(err.get("b").unwrap().to_string(), "b failed");
        assert!(err.get("c").unwrap().is_timeout());
        assert_eq!(err.timeout_count(), 1);
        assert_eq!(err.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn last_failure_for_a_key_wins() {
        let mut errors = BatchError::new();
        errors.add("dup", EntryError::rejected("first"));
        errors.add("dup", EntryError::rejected("second"));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("dup").unwrap().to_string(), "second");
    }

    #[test]
    fn display_names_every_failing_key() {
        let mut errors = BatchError::new();
        errors.add("k2", EntryError::rejected("disk full"));
        errors.add("k1", EntryError::rejected("bad value"));

        assert_eq!(
            errors.to_string(),
            "batch write failed for 2 key(s): [k1] bad value; [k2] disk full"
        );
    }
}
