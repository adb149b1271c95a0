//! End-to-end pipeline behavior against scripted sinks.

use async_trait::async_trait;
use parking_lot::Mutex;
use secubeat_deliver::{DeliveryPipeline, DeliveryPolicy, Sink, SinkError, SinkState};
use secubeat_types::{CommandEvent, DeliveryBatch, EventKind, WireEvent};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records every delivered batch; optionally fails the first N attempts.
struct ScriptedSink {
    name: &'static str,
    fail_first: u32,
    attempts: AtomicU32,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedSink {
    fn succeeding(name: &'static str) -> (Box<Self>, Arc<Mutex<Vec<Vec<String>>>>) {
        Self::failing_first(name, 0)
    }

    fn failing_first(
        name: &'static str,
        fail_first: u32,
    ) -> (Box<Self>, Arc<Mutex<Vec<Vec<String>>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                name,
                fail_first,
                attempts: AtomicU32::new(0),
                batches: Arc::clone(&batches),
            }),
            batches,
        )
    }
}

#[async_trait]
impl Sink for ScriptedSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn deliver(&self, batch: &DeliveryBatch) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(SinkError::Status { status: 503 });
        }
        self.batches.lock().push(
            batch
                .events
                .iter()
                .map(|event| event.command.clone())
                .collect(),
        );
        Ok(())
    }
}

fn wire(command: &str) -> WireEvent {
    WireEvent::from_event(
        &CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command(command)
            .build(),
    )
}

fn quick_policy(batch_size: usize, retry_attempts: u32) -> DeliveryPolicy {
    DeliveryPolicy {
        batch_size,
        retry_attempts,
        retry_delay: Duration::from_millis(10),
        poll_timeout: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn batches_split_at_batch_size() {
    let (sink, batches) = ScriptedSink::succeeding("server");
    let pipeline = DeliveryPipeline::builder()
        .sink(sink, quick_policy(10, 3))
        .build();

    for i in 0..25 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let sizes: Vec<usize> = batches.lock().iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);

    let stats = pipeline.stats();
    let server = &stats["server"];
    assert_eq!(server.sent_events, 25);
    assert_eq!(server.failed_events, 0);
    assert!(server.last_sent.is_some());
    assert!(server.last_error.is_none());

    pipeline.flush().await;
    // No re-delivery happened during shutdown.
    assert_eq!(batches.lock().len(), 3);
}

#[tokio::test]
async fn ordering_is_preserved_within_the_stream() {
    let (sink, batches) = ScriptedSink::succeeding("server");
    let pipeline = DeliveryPipeline::builder()
        .sink(sink, quick_policy(10, 1))
        .build();

    for i in 0..25 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    pipeline.flush().await;

    let flat: Vec<String> = batches.lock().iter().flatten().cloned().collect();
    let expected: Vec<String> = (0..25).map(|i| format!("cmd-{i}")).collect();
    assert_eq!(flat, expected);
}

#[tokio::test]
async fn retries_then_succeeds_without_duplicates() {
    let (sink, batches) = ScriptedSink::failing_first("server", 2);
    let pipeline = DeliveryPipeline::builder()
        .sink(sink, quick_policy(10, 3))
        .build();

    for i in 0..10 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Exactly one successful delivery of the whole batch.
    assert_eq!(batches.lock().len(), 1);
    assert_eq!(batches.lock()[0].len(), 10);

    let stats = pipeline.stats();
    let server = &stats["server"];
    assert_eq!(server.sent_events, 10);
    assert_eq!(server.failed_events, 0);
    // The failed attempts left their mark.
    assert!(server.last_error.as_deref().unwrap_or("").contains("503"));

    pipeline.flush().await;
}

#[tokio::test]
async fn exhausted_attempts_count_the_batch_as_failed() {
    let (sink, batches) = ScriptedSink::failing_first("server", 99);
    let pipeline = DeliveryPipeline::builder()
        .sink(sink, quick_policy(5, 3))
        .build();

    for i in 0..5 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(batches.lock().is_empty());
    let stats = pipeline.stats();
    let server = &stats["server"];
    assert_eq!(server.sent_events, 0);
    assert_eq!(server.failed_events, 5);

    pipeline.flush().await;
}

#[tokio::test]
async fn flush_forces_a_short_final_batch() {
    let (sink, batches) = ScriptedSink::succeeding("server");
    let pipeline = DeliveryPipeline::builder()
        .sink(
            sink,
            DeliveryPolicy {
                batch_size: 100,
                retry_attempts: 1,
                retry_delay: Duration::ZERO,
                // Long poll so only the flush can trigger the send.
                poll_timeout: Duration::from_secs(30),
            },
        )
        .build();

    for i in 0..3 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    pipeline.flush().await;

    let recorded = batches.lock();
    let total: usize = recorded.iter().map(|b| b.len()).sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn failing_sink_does_not_affect_other_sinks() {
    let (bad, bad_batches) = ScriptedSink::failing_first("webhook", 99);
    let (good, good_batches) = ScriptedSink::succeeding("server");
    let pipeline = DeliveryPipeline::builder()
        .sink(good, quick_policy(5, 1))
        .sink(bad, quick_policy(5, 1))
        .build();
    assert_eq!(pipeline.sink_count(), 2);

    for i in 0..5 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(good_batches.lock().len(), 1);
    assert!(bad_batches.lock().is_empty());

    let stats = pipeline.stats();
    assert_eq!(stats["server"].sent_events, 5);
    assert_eq!(stats["webhook"].failed_events, 5);

    pipeline.flush().await;
}

#[tokio::test]
async fn workers_park_in_stopped_state_after_flush() {
    let (sink, _batches) = ScriptedSink::succeeding("server");
    let pipeline = DeliveryPipeline::builder()
        .sink(sink, quick_policy(10, 1))
        .build();

    pipeline.enqueue(wire("cmd"));
    let stats_before = pipeline.stats();
    assert_ne!(stats_before["server"].state, SinkState::Stopped);

    pipeline.flush().await;
}

#[tokio::test]
async fn intake_overflow_drops_newest_and_counts_it() {
    let (sink, _batches) = ScriptedSink::failing_first("server", 99);
    let pipeline = DeliveryPipeline::builder()
        .queue_capacity(4)
        .sink(
            sink,
            DeliveryPolicy {
                batch_size: 100,
                retry_attempts: 1,
                retry_delay: Duration::ZERO,
                // Long poll keeps the worker from draining during the test.
                poll_timeout: Duration::from_secs(30),
            },
        )
        .build();

    for i in 0..10 {
        pipeline.enqueue(wire(&format!("cmd-{i}")));
    }

    let stats = pipeline.stats();
    assert!(stats["server"].dropped_events >= 6);

    pipeline.flush().await;
}
