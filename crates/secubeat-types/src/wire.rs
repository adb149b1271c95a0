//! Wire format: formatted events and the batch envelope.

use crate::{CommandEvent, CommandResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format version tag.
pub const WIRE_VERSION: &str = "1.0";

/// Fixed source tag carried in every batch envelope.
pub const SOURCE_TAG: &str = "secu-beat";

fn default_version() -> String {
    WIRE_VERSION.to_string()
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// A formatted event as delivered to sinks.
///
/// Keys with absent values are omitted entirely (sparse encoding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    /// Wire format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Event timestamp, RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// Event type name.
    pub event_type: String,
    /// Username, `"unknown"` when unresolved.
    pub user: String,
    /// Originating IP, `"unknown"` when uncorrelated.
    pub source_ip: String,
    /// Decoded command line.
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    /// Present (and true) only for demo-mode events.
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthetic: bool,
}

impl WireEvent {
    /// Format a command event for delivery.
    pub fn from_event(event: &CommandEvent) -> Self {
        Self {
            version: default_version(),
            timestamp: event.timestamp,
            event_type: event.kind.as_str().to_string(),
            user: if event.user.is_empty() {
                "unknown".to_string()
            } else {
                event.user.clone()
            },
            source_ip: event
                .source_ip
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            command: event.command.clone(),
            session_id: event.session_id.clone(),
            pid: event.pid,
            exit_code: event.exit_code,
            execution_time: event.execution_time,
            terminal: event.terminal.clone(),
            result: event.result.clone(),
            synthetic: event.synthetic,
        }
    }
}

impl From<&CommandEvent> for WireEvent {
    fn from(event: &CommandEvent) -> Self {
        Self::from_event(event)
    }
}

/// The batch envelope sent to HTTP-style sinks.
///
/// Constructed once per send attempt sequence; retries re-send it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryBatch {
    /// When the batch was assembled.
    pub timestamp: DateTime<Utc>,
    /// Fixed source tag.
    pub source: String,
    /// Ordered events.
    pub events: Vec<WireEvent>,
    /// Number of events in the batch.
    pub count: usize,
}

impl DeliveryBatch {
    /// Assemble a batch from formatted events.
    pub fn new(events: Vec<WireEvent>) -> Self {
        Self {
            timestamp: Utc::now(),
            source: SOURCE_TAG.to_string(),
            count: events.len(),
            events,
        }
    }

    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch carries no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
