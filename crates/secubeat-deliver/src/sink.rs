//! The sink abstraction and per-sink delivery policy.

use async_trait::async_trait;
use secubeat_types::DeliveryBatch;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned status {status}")]
    Status { status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("signature error: {0}")]
    Signature(String),
}

/// A delivery destination.
///
/// The pipeline holds a collection of this interface; no branching on
/// concrete sink types anywhere.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Stable sink name used for stats and logs.
    fn name(&self) -> &str;

    /// Attempt to deliver one batch. The batch is immutable; a retry
    /// re-sends it verbatim.
    async fn deliver(&self, batch: &DeliveryBatch) -> Result<(), SinkError>;
}

/// How a sink's worker batches and retries.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Maximum events per batch.
    pub batch_size: usize,
    /// Total attempts per batch (1 = no retries).
    pub retry_attempts: u32,
    /// Base backoff; attempt n sleeps `retry_delay × n`.
    pub retry_delay: Duration,
    /// How long the worker waits for more events before sending a short
    /// batch.
    pub poll_timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(1),
        }
    }
}

impl DeliveryPolicy {
    /// One event per attempt, no retries. Used by the webhook and syslog
    /// sinks, which never retry failures.
    pub fn single_shot() -> Self {
        Self {
            batch_size: 1,
            retry_attempts: 1,
            retry_delay: Duration::ZERO,
            poll_timeout: Duration::from_millis(200),
        }
    }
}
