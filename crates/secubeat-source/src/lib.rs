//! Audit event source.
//!
//! Produces a live, ordered, non-terminating stream of [`CommandEvent`]s
//! from the kernel audit subsystem, degrading gracefully across acquisition
//! strategies: privileged live streaming, bounded historical query, passive
//! log tailing, and finally synthetic demo events. Only one strategy is
//! active at a time; every failure falls through to the next.
//!
//! [`CommandEvent`]: secubeat_types::CommandEvent

mod demo;
mod history;
mod live;
mod parse;
mod rules;
mod source;
mod tail;

pub use parse::{decode_hex_command, resolve_username, RecordParser};
pub use rules::{AuditRules, DEFAULT_AUDIT_KEY};
pub use source::{AuditSource, EventStream, SourceConfig, SourceHandle, SourceMode};

use thiserror::Error;

/// Errors raised while acquiring audit events.
///
/// All of these are non-fatal: the source logs them and falls back to the
/// next acquisition strategy.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("audit stream ended unexpectedly")]
    StreamEnded,
}
