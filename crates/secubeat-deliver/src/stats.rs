//! Per-sink delivery statistics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Worker state for one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkState {
    /// Worker not started yet.
    Idle,
    /// Accumulating the next batch.
    Batching,
    /// A send attempt is in flight.
    Sending,
    /// Backing off before the next attempt.
    Retrying,
    /// Shut down after the final flush.
    Stopped,
}

/// Counters for one sink. Snapshot semantics: readers get a copy taken
/// under the same lock the worker writes under.
#[derive(Debug, Clone, Serialize)]
pub struct SinkStats {
    /// Events acknowledged by the sink.
    pub sent_events: u64,
    /// Events whose batch exhausted all attempts.
    pub failed_events: u64,
    /// Events dropped at intake because the queue was full.
    pub dropped_events: u64,
    /// When the last successful send completed.
    pub last_sent: Option<DateTime<Utc>>,
    /// Most recent attempt error.
    pub last_error: Option<String>,
    /// Current worker state.
    pub state: SinkState,
}

impl Default for SinkStats {
    fn default() -> Self {
        Self {
            sent_events: 0,
            failed_events: 0,
            dropped_events: 0,
            last_sent: None,
            last_error: None,
            state: SinkState::Idle,
        }
    }
}

/// Shared stats cell: written by one worker, snapshotted by status queries.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsCell {
    inner: Arc<Mutex<SinkStats>>,
}

impl StatsCell {
    pub(crate) fn record_sent(&self, count: u64) {
        let mut stats = self.inner.lock();
        stats.sent_events += count;
        stats.last_sent = Some(Utc::now());
    }

    pub(crate) fn record_failed(&self, count: u64) {
        self.inner.lock().failed_events += count;
    }

    pub(crate) fn record_dropped(&self) {
        self.inner.lock().dropped_events += 1;
    }

    pub(crate) fn record_attempt_error(&self, error: String) {
        self.inner.lock().last_error = Some(error);
    }

    pub(crate) fn set_state(&self, state: SinkState) {
        self.inner.lock().state = state;
    }

    pub(crate) fn snapshot(&self) -> SinkStats {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_a_copy() {
        let cell = StatsCell::default();
        cell.record_sent(10);
        let snapshot = cell.snapshot();
        cell.record_sent(5);

        assert_eq!(snapshot.sent_events, 10);
        assert_eq!(cell.snapshot().sent_events, 15);
        assert!(snapshot.last_sent.is_some());
    }

    #[test]
    fn test_state_transitions_visible() {
        let cell = StatsCell::default();
        assert_eq!(cell.snapshot().state, SinkState::Idle);
        cell.set_state(SinkState::Batching);
        assert_eq!(cell.snapshot().state, SinkState::Batching);
    }
}
