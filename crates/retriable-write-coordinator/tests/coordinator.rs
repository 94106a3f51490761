//! Integration tests for the write coordinator.
//!
//! A scripted in-memory writer stands in for a backend so each test controls
//! exactly which keys fail, hang, or succeed after retries.

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{BoxError, Entry, KeyExtractor};
use retriable_write_coordinator::{
    CoordinatorConfig, EntryWriter, JoinMode, RetryPolicy, WriteCoordinator,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    FailTimes(u32),
    AlwaysFail,
    Hang,
    Slow(Duration),
}

#[derive(Default)]
struct ScriptedWriter {
    behaviors: HashMap<String, Behavior>,
    attempts: Mutex<HashMap<String, u32>>,
    events: Mutex<Vec<String>>,
}

impl ScriptedWriter {
    fn new(behaviors: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors
                .iter()
                .map(|(key, behavior)| (key.to_string(), *behavior))
                .collect(),
            ..Default::default()
        })
    }

    fn attempts(&self, key: &str) -> u32 {
        self.attempts.lock().get(key).copied().unwrap_or(0)
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EntryWriter<String> for ScriptedWriter {
    async fn write(&self, entry: &Entry<String>) -> Result<(), BoxError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(entry.key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.events.lock().push(format!("start:{}", entry.value));

        // Values script individual entries when keys repeat.
        let behavior = self
            .behaviors
            .get(&entry.value)
            .or_else(|| self.behaviors.get(&entry.key))
            .copied()
            .unwrap_or(Behavior::Succeed);
        let result = match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::FailTimes(n) if attempt <= n => Err(format!("transient failure {}", attempt).into()),
            Behavior::FailTimes(_) => Ok(()),
            Behavior::AlwaysFail => Err(format!("rejected {}", entry.key).into()),
            Behavior::Hang => std::future::pending().await,
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        };

        self.events.lock().push(format!("end:{}", entry.value));
        result
    }
}

fn config(max_retries: u32, retry_ms: u64, budget: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        retry: RetryPolicy::new(max_retries, Duration::from_millis(retry_ms)),
        timeout: Duration::from_millis(50),
        budget_override: Some(budget),
        join_mode: JoinMode::PerResult,
        group_by_key: false,
    }
}

fn coordinator_for(cfg: CoordinatorConfig, writer: Arc<ScriptedWriter>) -> WriteCoordinator<String> {
    WriteCoordinator::new(cfg, writer)
}

fn entries(keys: &[&str]) -> Vec<Entry<String>> {
    keys.iter().map(|key| Entry::new(*key, key.to_string())).collect()
}

#[tokio::test]
async fn test_batch_all_succeed() {
    let writer = ScriptedWriter::new(&[]);
    let coordinator = coordinator_for(config(1, 1, Duration::from_secs(1)), writer.clone());

    coordinator
        .write_batch(entries(&["a", "b", "c"]))
        .await
        .expect("all writes succeed");

    for key in ["a", "b", "c"] {
        assert_eq!(writer.attempts(key), 1);
    }
}

#[tokio::test]
async fn test_empty_batch_is_ok() {
    let writer = ScriptedWriter::new(&[]);
    let coordinator = coordinator_for(config(1, 1, Duration::from_secs(1)), writer.clone());

    assert!(coordinator.write_batch(Vec::new()).await.is_ok());
    assert!(writer.events().is_empty());
}

#[tokio::test]
async fn test_batch_reports_exactly_the_failing_keys() {
    let writer = ScriptedWriter::new(&[("b", Behavior::AlwaysFail), ("d", Behavior::AlwaysFail)]);
    let coordinator = coordinator_for(config(2, 1, Duration::from_secs(1)), writer.clone());

    let err = coordinator
        .write_batch(entries(&["a", "b", "c", "d"]))
        .await
        .expect_err("two keys fail");

    assert_eq!(err.keys().collect::<Vec<_>>(), vec!["b", "d"]);
    assert_eq!(err.timeout_count(), 0);
    assert_eq!(err.get("b").map(|e| e.to_string()), Some("rejected b".to_string()));
    assert_eq!(writer.attempts("b"), 2);
    assert_eq!(writer.attempts("a"), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_backoff() {
    let writer = ScriptedWriter::new(&[("flaky", Behavior::FailTimes(2))]);
    let coordinator = coordinator_for(config(3, 20, Duration::from_secs(2)), writer.clone());

    let started = Instant::now();
    coordinator
        .write_single(Entry::new("flaky", "flaky".to_string()))
        .await
        .expect("third attempt succeeds");

    assert_eq!(writer.attempts("flaky"), 3);
    // 20ms after the first failure, 40ms after the second.
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_single_exhaustion_returns_last_error() {
    let writer = ScriptedWriter::new(&[("x", Behavior::AlwaysFail)]);
    let coordinator = coordinator_for(config(3, 1, Duration::from_secs(1)), writer.clone());

    let err = coordinator
        .write_single(Entry::new("x", "x".to_string()))
        .await
        .expect_err("always fails");

    assert!(!err.is_timeout());
    assert_eq!(err.to_string(), "rejected x");
    assert_eq!(writer.attempts("x"), 3);
}

#[tokio::test]
async fn test_single_hanging_write_times_out_within_budget() {
    let budget = Duration::from_millis(100);
    let writer = ScriptedWriter::new(&[("stuck", Behavior::Hang)]);
    let coordinator = coordinator_for(config(1, 1, budget), writer);

    let started = Instant::now();
    let err = coordinator
        .write_single(Entry::new("stuck", "stuck".to_string()))
        .await
        .expect_err("hangs");

    assert!(err.is_timeout());
    assert!(started.elapsed() >= budget);
    assert!(started.elapsed() < budget + Duration::from_millis(500));
}

#[tokio::test]
async fn test_hanging_writer_reported_as_timeout() {
    let budget = Duration::from_millis(150);
    let writer = ScriptedWriter::new(&[("2", Behavior::Hang)]);
    let coordinator = coordinator_for(config(1, 1, budget), writer);

    let started = Instant::now();
    let err = coordinator
        .write_batch(entries(&["1", "2", "3"]))
        .await
        .expect_err("one writer hangs");
    let elapsed = started.elapsed();

    assert_eq!(err.len(), 1);
    assert!(err.get("2").is_some_and(|e| e.is_timeout()));
    assert!(!err.contains("1"));
    assert!(!err.contains("3"));
    assert!(elapsed >= budget);
    assert!(elapsed < budget + Duration::from_millis(500));
}

#[tokio::test]
async fn test_every_submitted_key_accounted_for() {
    let budget = Duration::from_millis(100);
    let writer = ScriptedWriter::new(&[
        ("fail", Behavior::AlwaysFail),
        ("hang-1", Behavior::Hang),
        ("hang-2", Behavior::Hang),
    ]);
    let coordinator = coordinator_for(config(1, 1, budget), writer);

    let err = coordinator
        .write_batch(entries(&["ok", "fail", "hang-1", "hang-2"]))
        .await
        .expect_err("mixed batch");

    assert_eq!(err.keys().collect::<Vec<_>>(), vec!["fail", "hang-1", "hang-2"]);
    assert_eq!(err.timeout_count(), 2);
    assert!(!err.get("fail").is_some_and(|e| e.is_timeout()));
}

#[tokio::test]
async fn test_repeated_key_with_one_hung_write_is_a_timeout() {
    let writer = ScriptedWriter::new(&[("dup-hang", Behavior::Hang)]);
    let coordinator = coordinator_for(config(1, 1, Duration::from_millis(100)), writer.clone());

    let err = coordinator
        .write_batch(vec![
            Entry::new("dup", "dup-hang".to_string()),
            Entry::new("dup", "dup-ok".to_string()),
            Entry::new("other", "other".to_string()),
        ])
        .await
        .expect_err("hung write must not be reported as success");

    assert_eq!(err.keys().collect::<Vec<_>>(), vec!["dup"]);
    assert!(err.get("dup").unwrap().is_timeout());
    assert!(writer.events().contains(&"end:dup-ok".to_string()));
}

#[tokio::test]
async fn test_repeated_key_all_succeed() {
    let writer = ScriptedWriter::new(&[]);
    let coordinator = coordinator_for(config(1, 1, Duration::from_secs(1)), writer.clone());

    coordinator
        .write_batch(vec![
            Entry::new("dup", "first".to_string()),
            Entry::new("dup", "second".to_string()),
        ])
        .await
        .expect("both writes succeed");
    assert_eq!(writer.attempts("dup"), 2);
}

#[tokio::test]
async fn test_shared_deadline_bounds_whole_batch() {
    let budget = Duration::from_millis(120);
    let writer = ScriptedWriter::new(&[
        ("a", Behavior::Slow(Duration::from_millis(80))),
        ("b", Behavior::Slow(Duration::from_millis(400))),
        ("c", Behavior::Hang),
    ]);
    let mut cfg = config(1, 1, budget);
    cfg.join_mode = JoinMode::SharedDeadline;
    let coordinator = coordinator_for(cfg, writer);

    let started = Instant::now();
    let err = coordinator
        .write_batch(entries(&["a", "b", "c"]))
        .await
        .expect_err("b and c miss the deadline");

    assert_eq!(err.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(err.timeout_count(), 2);
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_grouped_entries_write_sequentially() {
    let writer = ScriptedWriter::new(&[(
        "same",
        Behavior::Slow(Duration::from_millis(30)),
    )]);
    let mut cfg = config(1, 1, Duration::from_secs(1));
    cfg.group_by_key = true;
    let coordinator = coordinator_for(cfg, writer.clone());
    assert!(coordinator.is_grouped());

    let batch = vec![
        Entry::new("same", "A".to_string()),
        Entry::new("same", "B".to_string()),
    ];
    coordinator.write_batch(batch).await.expect("both succeed");

    assert_eq!(writer.events(), vec!["start:A", "end:A", "start:B", "end:B"]);
}

#[tokio::test]
async fn test_distinct_groups_write_concurrently() {
    let slow = Behavior::Slow(Duration::from_millis(100));
    let writer = ScriptedWriter::new(&[("x", slow), ("y", slow)]);
    let mut cfg = config(1, 1, Duration::from_secs(1));
    cfg.group_by_key = true;
    let coordinator = coordinator_for(cfg, writer.clone());

    coordinator
        .write_batch(entries(&["x", "y"]))
        .await
        .expect("both succeed");

    let events = writer.events();
    let first_end = events
        .iter()
        .position(|event| event.starts_with("end:"))
        .expect("an end event");
    assert_eq!(
        events[..first_end].iter().filter(|e| e.starts_with("start:")).count(),
        2,
        "both groups start before either finishes: {:?}",
        events
    );
}

#[tokio::test]
async fn test_custom_group_key_serialises_across_entry_keys() {
    let writer = ScriptedWriter::new(&[
        ("order-1", Behavior::Slow(Duration::from_millis(20))),
        ("order-2", Behavior::Slow(Duration::from_millis(20))),
    ]);
    let by_prefix: KeyExtractor<String> = Arc::new(|entry: &Entry<String>| {
        entry.key.split('-').next().unwrap_or_default().to_string()
    });
    let coordinator = coordinator_for(config(1, 1, Duration::from_secs(1)), writer.clone())
        .with_group_key(by_prefix);

    coordinator
        .write_batch(vec![
            Entry::new("order-1", "first".to_string()),
            Entry::new("order-2", "second".to_string()),
        ])
        .await
        .expect("both succeed");

    assert_eq!(
        writer.events(),
        vec!["start:first", "end:first", "start:second", "end:second"]
    );
}

#[tokio::test]
async fn test_with_span_still_writes() {
    let writer = ScriptedWriter::new(&[]);
    let coordinator = coordinator_for(config(1, 1, Duration::from_secs(1)), writer.clone())
        .with_span(tracing::info_span!("sink", backend = "test"));

    coordinator
        .write_single(Entry::new("k", "k".to_string()))
        .await
        .expect("write succeeds");
    assert_eq!(writer.attempts("k"), 1);
}
