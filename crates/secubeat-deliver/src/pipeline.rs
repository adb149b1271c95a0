//! Fan-out intake and per-sink delivery workers.

use crate::sink::{DeliveryPolicy, Sink};
use crate::stats::{SinkState, SinkStats, StatsCell};
use secubeat_types::{DeliveryBatch, WireEvent};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default per-sink intake capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// How long `flush` waits for workers to finish their final sends.
const FLUSH_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

struct SinkEntry {
    name: String,
    intake: mpsc::Sender<WireEvent>,
    stats: StatsCell,
    worker: JoinHandle<()>,
}

/// Builder for a delivery pipeline.
pub struct DeliveryPipelineBuilder {
    queue_capacity: usize,
    registrations: Vec<(Box<dyn Sink>, DeliveryPolicy)>,
}

impl DeliveryPipelineBuilder {
    /// Override the per-sink intake capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Register a sink with its delivery policy.
    pub fn sink(mut self, sink: Box<dyn Sink>, policy: DeliveryPolicy) -> Self {
        self.registrations.push((sink, policy));
        self
    }

    /// Spawn workers and return the running pipeline.
    pub fn build(self) -> DeliveryPipeline {
        let (stop_tx, stop_rx) = watch::channel(false);
        let sinks = self
            .registrations
            .into_iter()
            .map(|(sink, policy)| {
                let (intake, rx) = mpsc::channel(self.queue_capacity);
                let stats = StatsCell::default();
                let name = sink.name().to_string();
                let worker = tokio::spawn(run_worker(
                    sink,
                    policy,
                    rx,
                    stats.clone(),
                    stop_rx.clone(),
                ));
                SinkEntry {
                    name,
                    intake,
                    stats,
                    worker,
                }
            })
            .collect();

        DeliveryPipeline {
            sinks,
            stop: stop_tx,
        }
    }
}

/// The delivery pipeline.
///
/// One worker task per sink; the shared intake never blocks the caller.
pub struct DeliveryPipeline {
    sinks: Vec<SinkEntry>,
    stop: watch::Sender<bool>,
}

impl DeliveryPipeline {
    /// Start building a pipeline.
    pub fn builder() -> DeliveryPipelineBuilder {
        DeliveryPipelineBuilder {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            registrations: Vec::new(),
        }
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Queue an event for every sink. Never blocks; a full intake drops
    /// the incoming event for that sink only.
    pub fn enqueue(&self, event: WireEvent) {
        for entry in &self.sinks {
            match entry.intake.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(sink = %entry.name, "intake full, dropping event");
                    entry.stats.record_dropped();
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(sink = %entry.name, "intake closed, dropping event");
                }
            }
        }
    }

    /// Immutable per-sink statistics snapshots.
    pub fn stats(&self) -> HashMap<String, SinkStats> {
        self.sinks
            .iter()
            .map(|entry| (entry.name.clone(), entry.stats.snapshot()))
            .collect()
    }

    /// Drain remaining queued events with a forced final send per sink,
    /// then stop all workers. Used at shutdown.
    pub async fn flush(self) {
        let _ = self.stop.send(true);
        for entry in self.sinks {
            // Closing the intake lets the worker finish its final drain.
            drop(entry.intake);
            if tokio::time::timeout(FLUSH_JOIN_TIMEOUT, entry.worker)
                .await
                .is_err()
            {
                warn!(sink = %entry.name, "worker did not stop in time");
            }
        }
    }
}

async fn run_worker(
    sink: Box<dyn Sink>,
    policy: DeliveryPolicy,
    mut rx: mpsc::Receiver<WireEvent>,
    stats: StatsCell,
    mut stop: watch::Receiver<bool>,
) {
    let name = sink.name().to_string();
    debug!(sink = %name, "delivery worker started");

    let mut intake_closed = false;
    while !intake_closed && !*stop.borrow() {
        stats.set_state(SinkState::Batching);
        let mut batch = Vec::with_capacity(policy.batch_size);
        let deadline = tokio::time::Instant::now() + policy.poll_timeout;

        while batch.len() < policy.batch_size {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(event) => batch.push(event),
                    None => {
                        intake_closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => break,
                changed = stop.changed() => {
                    // A dropped stop sender means the pipeline is gone.
                    if changed.is_err() {
                        intake_closed = true;
                    }
                    break;
                }
            }
        }

        if !batch.is_empty() {
            send_batch(sink.as_ref(), &policy, batch, &stats, &mut stop).await;
        }
    }

    // Final flush: force-send whatever is still queued, regardless of the
    // batch-size threshold.
    loop {
        let mut batch = Vec::with_capacity(policy.batch_size);
        while batch.len() < policy.batch_size {
            match rx.try_recv() {
                Ok(event) => batch.push(event),
                Err(_) => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        send_batch(sink.as_ref(), &policy, batch, &stats, &mut stop).await;
    }

    stats.set_state(SinkState::Stopped);
    debug!(sink = %name, "delivery worker stopped");
}

async fn send_batch(
    sink: &dyn Sink,
    policy: &DeliveryPolicy,
    events: Vec<WireEvent>,
    stats: &StatsCell,
    stop: &mut watch::Receiver<bool>,
) {
    let count = events.len() as u64;
    // Constructed once; retries re-send the same envelope verbatim.
    let batch = DeliveryBatch::new(events);
    let attempts = policy.retry_attempts.max(1);

    for attempt in 1..=attempts {
        stats.set_state(SinkState::Sending);
        match sink.deliver(&batch).await {
            Ok(()) => {
                stats.record_sent(count);
                debug!(sink = %sink.name(), count, "batch delivered");
                return;
            }
            Err(error) => {
                warn!(
                    sink = %sink.name(),
                    attempt,
                    attempts,
                    error = %error,
                    "delivery attempt failed"
                );
                stats.record_attempt_error(error.to_string());
            }
        }

        if attempt < attempts {
            if *stop.borrow() {
                break;
            }
            stats.set_state(SinkState::Retrying);
            let backoff = policy.retry_delay * attempt;
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = stop.changed() => break,
            }
        }
    }

    stats.record_failed(count);
    warn!(sink = %sink.name(), count, "batch failed after all attempts");
}
