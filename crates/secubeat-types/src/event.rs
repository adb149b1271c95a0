//! Core command event type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of activity an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A process-execution syscall.
    CommandExecution,
    /// A session login.
    UserLogin,
    /// A session logout.
    UserLogout,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandExecution => "command_execution",
            Self::UserLogin => "user_login",
            Self::UserLogout => "user_logout",
        }
    }
}

/// One observed execution (or session transition) on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
    /// Event kind.
    pub kind: EventKind,
    /// Resolved username, or `uid:<n>` when resolution failed.
    pub user: String,
    /// Raw numeric user id, when present in the record.
    pub uid: Option<String>,
    /// Kernel-assigned session id. Reused over time, not globally unique.
    pub session_id: Option<String>,
    /// Decoded command line, whitespace-collapsed.
    pub command: String,
    /// Originating IP address, populated only via session correlation.
    pub source_ip: Option<String>,
    /// Process id, when known.
    pub pid: Option<u32>,
    /// Exit code, when known.
    pub exit_code: Option<i32>,
    /// Wall-clock execution time in seconds, when known.
    pub execution_time: Option<f64>,
    /// Controlling terminal, when known.
    pub terminal: Option<String>,
    /// Best-effort execution result.
    pub result: Option<CommandResult>,
    /// True for events synthesized by demo mode.
    #[serde(default)]
    pub synthetic: bool,
}

/// Best-effort result of a tracked command.
///
/// Output capture is a placeholder only; see the tracker for details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Process id the result belongs to.
    pub pid: u32,
    /// The command line.
    pub command: String,
    /// Exit code, if the process was observed finishing.
    pub exit_code: Option<i32>,
    /// Placeholder output text.
    pub output: String,
    /// Seconds between observation and completion.
    pub execution_time: f64,
    /// When the result was recorded.
    pub completed_at: DateTime<Utc>,
}

impl CommandEvent {
    /// Create a new event builder.
    pub fn builder(kind: EventKind) -> CommandEventBuilder {
        CommandEventBuilder::new(kind)
    }

    /// Whether the event satisfies the completeness invariant.
    ///
    /// Incomplete events must never leave the audit source.
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.command.is_empty()
    }
}

/// Builder for constructing command events.
#[derive(Debug)]
pub struct CommandEventBuilder {
    kind: EventKind,
    timestamp: Option<DateTime<Utc>>,
    user: String,
    uid: Option<String>,
    session_id: Option<String>,
    command: String,
    source_ip: Option<String>,
    pid: Option<u32>,
    exit_code: Option<i32>,
    execution_time: Option<f64>,
    terminal: Option<String>,
    result: Option<CommandResult>,
    synthetic: bool,
}

impl CommandEventBuilder {
    /// Create a new builder.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
            user: String::new(),
            uid: None,
            session_id: None,
            command: String::new(),
            source_ip: None,
            pid: None,
            exit_code: None,
            execution_time: None,
            terminal: None,
            result: None,
            synthetic: false,
        }
    }

    /// Set the timestamp (defaults to now).
    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the raw uid.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set the session id.
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Set the command line.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the originating IP.
    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    /// Set the process id.
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Set the exit code.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Set the execution time in seconds.
    pub fn execution_time(mut self, secs: f64) -> Self {
        self.execution_time = Some(secs);
        self
    }

    /// Set the terminal.
    pub fn terminal(mut self, terminal: impl Into<String>) -> Self {
        self.terminal = Some(terminal.into());
        self
    }

    /// Attach an execution result.
    pub fn result(mut self, result: CommandResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Mark the event as demo-mode synthetic.
    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Build the event.
    pub fn build(self) -> CommandEvent {
        CommandEvent {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            kind: self.kind,
            user: self.user,
            uid: self.uid,
            session_id: self.session_id,
            command: self.command,
            source_ip: self.source_ip,
            pid: self.pid,
            exit_code: self.exit_code,
            execution_time: self.execution_time,
            terminal: self.terminal,
            result: self.result,
            synthetic: self.synthetic,
        }
    }
}
