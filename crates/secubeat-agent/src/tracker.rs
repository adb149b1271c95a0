//! Command history tracking.
//!
//! Keeps a bounded in-memory ring of recent events and attaches the
//! best-effort execution result. Output capture is a placeholder only.

use chrono::Utc;
use secubeat_types::{CommandEvent, CommandResult, EventKind};
use std::collections::VecDeque;

/// Bounded command history with placeholder result enrichment.
pub struct CommandTracker {
    history: VecDeque<CommandEvent>,
    capacity: usize,
}

impl CommandTracker {
    /// Create a tracker keeping at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Enrich an execution event with its result and remember it.
    pub fn track(&mut self, event: &mut CommandEvent) {
        if event.kind == EventKind::CommandExecution && event.result.is_none() {
            if let Some(pid) = event.pid {
                event.result = Some(CommandResult {
                    pid,
                    command: event.command.clone(),
                    exit_code: event.exit_code,
                    output: format!("[Command executed: {}]", event.command),
                    execution_time: event.execution_time.unwrap_or(0.0),
                    completed_at: Utc::now(),
                });
            }
        }

        self.history.push_back(event.clone());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// The most recent `count` events, oldest first.
    pub fn recent(&self, count: usize) -> Vec<CommandEvent> {
        let start = self.history.len().saturating_sub(count);
        self.history.iter().skip(start).cloned().collect()
    }

    /// Number of remembered events.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(command: &str) -> CommandEvent {
        CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command(command)
            .pid(1234)
            .build()
    }

    #[test]
    fn test_placeholder_result_attached() {
        let mut tracker = CommandTracker::new(10);
        let mut ev = event("ls -la");
        tracker.track(&mut ev);

        let result = ev.result.expect("result attached");
        assert_eq!(result.pid, 1234);
        assert_eq!(result.output, "[Command executed: ls -la]");
        assert!(result.exit_code.is_none());
    }

    #[test]
    fn test_no_result_without_pid() {
        let mut tracker = CommandTracker::new(10);
        let mut ev = CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command("ls")
            .build();
        tracker.track(&mut ev);
        assert!(ev.result.is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = CommandTracker::new(3);
        for i in 0..5 {
            let mut ev = event(&format!("cmd-{i}"));
            tracker.track(&mut ev);
        }

        assert_eq!(tracker.len(), 3);
        let recent = tracker.recent(10);
        let commands: Vec<&str> = recent.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["cmd-2", "cmd-3", "cmd-4"]);
    }

    #[test]
    fn test_recent_returns_newest_slice() {
        let mut tracker = CommandTracker::new(10);
        for i in 0..5 {
            let mut ev = event(&format!("cmd-{i}"));
            tracker.track(&mut ev);
        }
        let recent = tracker.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].command, "cmd-4");
    }
}
