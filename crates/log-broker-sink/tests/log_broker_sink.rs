//! Log-broker sink behaviour against an in-memory producer.

use async_trait::async_trait;
use log_broker_sink::{
    bytes_serializer, json_serializer, BrokerError, LogBrokerSink, LogBrokerSinkConfig, LogWriter,
    Message,
};
use parking_lot::Mutex;
use relay_core::{BoxError, Entry, KeyExtractor, Sink, SinkError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct FakeProducer {
    produced: Mutex<Vec<Message>>,
    calls: AtomicU32,
    fail_first: u32,
    always_fail: bool,
    hang: bool,
    no_brokers: bool,
}

#[async_trait]
impl LogWriter for FakeProducer {
    async fn write_messages(&self, messages: &[Message]) -> Result<(), BrokerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.always_fail || call <= self.fail_first {
            return Err(BrokerError::Unavailable(format!("leader not available (call {})", call)));
        }
        self.produced.lock().extend_from_slice(messages);
        Ok(())
    }

    async fn brokers(&self) -> Result<Vec<String>, BrokerError> {
        if self.no_brokers {
            Ok(Vec::new())
        } else {
            Ok(vec!["127.0.0.1:9092".to_string()])
        }
    }
}

fn config(max_retries: u32) -> LogBrokerSinkConfig {
    let mut config = LogBrokerSinkConfig::new(vec!["127.0.0.1:9092".into()], "events");
    config.max_retries = max_retries;
    config.retry_timeout_ms = 5;
    config
}

async fn bytes_sink(producer: Arc<FakeProducer>, max_retries: u32) -> LogBrokerSink<FakeProducer, Vec<u8>> {
    LogBrokerSink::connect(config(max_retries), producer, bytes_serializer())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_batch_produces_one_call() {
    let producer = Arc::new(FakeProducer::default());
    let sink = bytes_sink(producer.clone(), 3).await;

    sink.batch(vec![
        Entry::new("k1", b"one".to_vec()),
        Entry::new("k2", b"two".to_vec()),
    ])
    .await
    .unwrap();

    assert_eq!(producer.calls.load(Ordering::SeqCst), 1);
    let produced = producer.produced.lock();
    assert_eq!(produced[0].key, b"k1".to_vec());
    assert_eq!(produced[1].value, b"two".to_vec());
}

#[tokio::test]
async fn test_transient_failure_retried() {
    let producer = Arc::new(FakeProducer {
        fail_first: 2,
        ..Default::default()
    });
    let sink = bytes_sink(producer.clone(), 3).await;

    sink.single(Entry::new("k", b"v".to_vec())).await.unwrap();
    assert_eq!(producer.calls.load(Ordering::SeqCst), 3);
    assert_eq!(producer.produced.lock().len(), 1);
}

#[tokio::test]
async fn test_failed_batch_maps_every_key() {
    let producer = Arc::new(FakeProducer {
        always_fail: true,
        ..Default::default()
    });
    let sink = bytes_sink(producer.clone(), 2).await;

    let err = sink
        .batch(vec![
            Entry::new("a", b"1".to_vec()),
            Entry::new("b", b"2".to_vec()),
        ])
        .await
        .unwrap_err();

    let batch = err.as_batch().expect("batch error");
    assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(batch
        .get("a")
        .unwrap()
        .to_string()
        .contains("leader not available (call 2)"));
    assert_eq!(producer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_serialization_failure_reported_per_key() {
    let producer = Arc::new(FakeProducer::default());
    let strict: log_broker_sink::Serializer<Value> =
        Arc::new(|entry: &Entry<Value>| -> Result<Vec<u8>, BoxError> {
            match entry.value.as_str() {
                Some(text) => Ok(text.as_bytes().to_vec()),
                None => Err("value must be a string".into()),
            }
        });
    let sink = LogBrokerSink::connect(config(1), producer.clone(), strict)
        .await
        .unwrap();

    let err = sink
        .batch(vec![Entry::new("ok", json!("fine")), Entry::new("bad", json!(7))])
        .await
        .unwrap_err();

    assert_eq!(err.as_batch().unwrap().keys().collect::<Vec<_>>(), vec!["bad"]);
    assert_eq!(producer.produced.lock().len(), 1);
}

#[tokio::test]
async fn test_custom_key_and_json_payload() {
    let producer = Arc::new(FakeProducer::default());
    let by_user: KeyExtractor<Value> = Arc::new(|entry: &Entry<Value>| {
        entry.value["user"].as_str().unwrap_or_default().to_string()
    });
    let sink = LogBrokerSink::connect(config(1), producer.clone(), json_serializer::<Value>())
        .await
        .unwrap()
        .with_key_extractor(by_user);

    sink.single(Entry::new("e-1", json!({ "user": "u-42" })))
        .await
        .unwrap();

    let produced = producer.produced.lock();
    assert_eq!(produced[0].key, b"u-42".to_vec());
    assert_eq!(produced[0].value, br#"{"user":"u-42"}"#.to_vec());
}

#[tokio::test]
async fn test_write_timeout_bounds_each_attempt() {
    let producer = Arc::new(FakeProducer {
        hang: true,
        ..Default::default()
    });
    let mut cfg = config(1);
    cfg.write_timeout_secs = 1;
    let sink: LogBrokerSink<FakeProducer, Vec<u8>> =
        LogBrokerSink::connect(cfg, producer, bytes_serializer()).await.unwrap();

    let started = Instant::now();
    let err = sink.single(Entry::new("k", b"v".to_vec())).await.unwrap_err();

    assert!(err.to_string().contains("write timed out"));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_async_writes_return_immediately() {
    let producer = Arc::new(FakeProducer::default());
    let mut cfg = config(1);
    cfg.async_writes = true;
    let sink: LogBrokerSink<FakeProducer, Vec<u8>> =
        LogBrokerSink::connect(cfg, producer.clone(), bytes_serializer()).await.unwrap();

    sink.single(Entry::new("k", b"v".to_vec())).await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while producer.produced.lock().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(producer.produced.lock().len(), 1);
}

#[tokio::test]
async fn test_connect_requires_brokers() {
    let producer = Arc::new(FakeProducer {
        no_brokers: true,
        ..Default::default()
    });
    let result: Result<LogBrokerSink<FakeProducer, Vec<u8>>, SinkError> =
        LogBrokerSink::connect(config(1), producer, bytes_serializer()).await;
    assert!(matches!(result, Err(SinkError::Unreachable(_))));
}
