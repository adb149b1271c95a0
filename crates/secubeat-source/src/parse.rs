//! Audit record parsing.
//!
//! Turns line-oriented audit tool output (or raw audit log lines) into
//! [`CommandEvent`]s. Execution records may span several lines (SYSCALL,
//! EXECVE, PROCTITLE); partial records are carried forward and merged until
//! they satisfy the completeness invariant, with no timeout.

use regex::Regex;
use secubeat_correlate::SessionCorrelator;
use secubeat_types::{CommandEvent, EventKind};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// How many recently-seen audit record ids are remembered for dedup.
const DEDUP_CAPACITY: usize = 4096;

/// Decode a kernel-hex-encoded command token.
///
/// Each byte pair becomes one character; embedded NUL separators are
/// collapsed to single spaces and the result is trimmed. Any decode failure
/// passes the raw token through unchanged rather than discarding the event.
pub fn decode_hex_command(hex: &str) -> String {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return hex.to_string();
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks(2) {
        let pair = match std::str::from_utf8(pair) {
            Ok(p) => p,
            Err(_) => return hex.to_string(),
        };
        match u8::from_str_radix(pair, 16) {
            Ok(byte) => bytes.push(byte),
            Err(_) => return hex.to_string(),
        }
    }

    let text = String::from_utf8_lossy(&bytes);
    let collapsed: Vec<&str> = text.split('\0').filter(|part| !part.is_empty()).collect();
    collapsed.join(" ").trim().to_string()
}

/// Resolve a numeric uid to a display name via the system user database,
/// falling back to a synthetic `uid:<n>` label.
pub fn resolve_username(uid: u32) -> String {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => format!("uid:{uid}"),
    }
}

/// An execution record under assembly.
#[derive(Debug, Default)]
struct PartialExec {
    audit_id: Option<String>,
    session_id: Option<String>,
    user: Option<String>,
    uid: Option<String>,
    command: Option<String>,
    pid: Option<u32>,
}

impl PartialExec {
    fn is_complete(&self) -> bool {
        self.user.as_deref().is_some_and(|user| !user.is_empty())
            && self.command.as_deref().is_some_and(|cmd| !cmd.is_empty())
    }
}

/// Bounded set of recently-seen audit record ids.
///
/// Guards against re-delivering records that the historical query already
/// yielded before the source fell through to tail mode.
#[derive(Debug, Default)]
struct DedupRing {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupRing {
    /// Insert an id; returns false if it was already present.
    fn insert(&mut self, id: String) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > DEDUP_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// Stateful audit record parser.
///
/// Feeds login/logout records into the session correlator and emits
/// complete execution events enriched with the correlated origin address.
pub struct RecordParser {
    correlator: Arc<SessionCorrelator>,
    current: Option<PartialExec>,
    seen: DedupRing,
    audit_id_re: Regex,
    session_re: Regex,
    uid_re: Regex,
    pid_re: Regex,
    proctitle_re: Regex,
    login_re: Regex,
}

impl RecordParser {
    /// Create a parser feeding the given correlator.
    pub fn new(correlator: Arc<SessionCorrelator>) -> Self {
        Self {
            correlator,
            current: None,
            seen: DedupRing::default(),
            audit_id_re: Regex::new(r"audit\((\d+\.\d+):(\d+)\)").expect("static regex"),
            session_re: Regex::new(r"\bses=(\d+)").expect("static regex"),
            uid_re: Regex::new(r"\buid=(\d+)").expect("static regex"),
            pid_re: Regex::new(r"\bpid=(\d+)").expect("static regex"),
            proctitle_re: Regex::new(r"proctitle=([0-9A-Fa-f]+)").expect("static regex"),
            login_re: Regex::new(r"addr=([0-9.]+).*?res=success").expect("static regex"),
        }
    }

    fn capture<'t>(&self, re: &Regex, line: &'t str) -> Option<&'t str> {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn audit_id(&self, line: &str) -> Option<String> {
        self.audit_id_re
            .captures(line)
            .map(|caps| format!("{}:{}", &caps[1], &caps[2]))
    }

    /// Feed one line; returns a complete execution event when one is ready.
    ///
    /// Login records update the correlator, logout records evict it; neither
    /// is emitted as an event. Incomplete execution records are silently
    /// carried forward and merged with subsequent lines.
    pub fn parse_line(&mut self, line: &str) -> Option<CommandEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.contains("type=USER_LOGIN") {
            self.handle_login(line);
            return None;
        }
        if line.contains("type=USER_END") || line.contains("type=USER_LOGOUT") {
            self.handle_logout(line);
            return None;
        }
        if line.contains("type=EXECVE")
            || line.contains("type=SYSCALL")
            || line.contains("type=PROCTITLE")
        {
            return self.merge_exec_line(line);
        }

        None
    }

    fn handle_login(&mut self, line: &str) {
        let addr = self.capture(&self.login_re, line);
        let session = self.capture(&self.session_re, line);
        if let (Some(addr), Some(session)) = (addr, session) {
            self.correlator.record_login(session, addr);
        }
    }

    fn handle_logout(&mut self, line: &str) {
        if let Some(session) = self.capture(&self.session_re, line) {
            self.correlator.record_logout(session);
        }
    }

    fn merge_exec_line(&mut self, line: &str) -> Option<CommandEvent> {
        let partial = self.current.get_or_insert_with(PartialExec::default);

        if partial.audit_id.is_none() {
            partial.audit_id = self.audit_id_re.captures(line).map(|caps| {
                format!("{}:{}", &caps[1], &caps[2])
            });
        }
        if partial.session_id.is_none() {
            if let Some(ses) = self
                .session_re
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
            {
                partial.session_id = Some(ses);
            }
        }
        if partial.uid.is_none() {
            if let Some(uid) = self
                .uid_re
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
            {
                if let Ok(n) = uid.parse::<u32>() {
                    partial.user = Some(resolve_username(n));
                }
                partial.uid = Some(uid);
            }
        }
        if partial.pid.is_none() {
            if let Some(pid) = self
                .pid_re
                .captures(line)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
            {
                partial.pid = Some(pid);
            }
        }
        if partial.command.is_none() {
            if let Some(hex) = self
                .proctitle_re
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
            {
                let decoded = decode_hex_command(&hex);
                if !decoded.is_empty() {
                    partial.command = Some(decoded);
                }
            }
        }

        if !partial.is_complete() {
            return None;
        }

        let partial = self.current.take()?;
        if let Some(id) = &partial.audit_id {
            if !self.seen.insert(id.clone()) {
                trace!(audit_id = %id, "dropped duplicate audit record");
                return None;
            }
        }

        let mut builder = CommandEvent::builder(EventKind::CommandExecution)
            .user(partial.user.unwrap_or_default())
            .command(partial.command.unwrap_or_default());
        if let Some(uid) = partial.uid {
            builder = builder.uid(uid);
        }
        if let Some(pid) = partial.pid {
            builder = builder.pid(pid);
        }
        if let Some(session) = &partial.session_id {
            builder = builder.session_id(session.clone());
            if let Some(ip) = self.correlator.lookup(session) {
                builder = builder.source_ip(ip);
            }
        }

        let event = builder.build();
        debug_assert!(event.is_complete());
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // A uid far outside any realistic passwd range, so resolution falls
    // back to the synthetic label deterministically.
    const NO_SUCH_UID: u32 = 4_000_000;

    fn parser() -> RecordParser {
        RecordParser::new(Arc::new(SessionCorrelator::new()))
    }

    fn hex(text: &str) -> String {
        text.bytes().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_decode_hex_command() {
        assert_eq!(decode_hex_command("6C73002D6C61"), "ls -la");
        assert_eq!(decode_hex_command(&hex("git\0status")), "git status");
    }

    #[test]
    fn test_decode_collapses_nul_runs() {
        assert_eq!(decode_hex_command(&hex("ls\0\0-la\0")), "ls -la");
    }

    #[test]
    fn test_decode_failure_passes_token_through() {
        assert_eq!(decode_hex_command("6C7"), "6C7");
        assert_eq!(decode_hex_command("zz00"), "zz00");
        assert_eq!(decode_hex_command(""), "");
    }

    #[test]
    fn test_single_line_execve_record() {
        let mut parser = parser();
        let line = format!(
            "type=EXECVE msg=audit(1700000000.123:42): ses=7 uid={NO_SUCH_UID} pid=555 proctitle={}",
            hex("ls\0-la")
        );
        let event = parser.parse_line(&line).expect("complete event");
        assert_eq!(event.command, "ls -la");
        assert_eq!(event.user, format!("uid:{NO_SUCH_UID}"));
        assert_eq!(event.session_id.as_deref(), Some("7"));
        assert_eq!(event.pid, Some(555));
        assert!(event.source_ip.is_none());
    }

    #[test]
    fn test_multi_line_record_merges_until_complete() {
        let mut parser = parser();
        let syscall = format!(
            "type=SYSCALL msg=audit(1700000001.500:43): arch=c000003e syscall=59 \
             ses=9 uid={NO_SUCH_UID} pid=600 key=\"commands\""
        );
        assert!(parser.parse_line(&syscall).is_none());

        let proctitle = format!(
            "type=PROCTITLE msg=audit(1700000001.500:43): proctitle={}",
            hex("ps\0aux")
        );
        let event = parser.parse_line(&proctitle).expect("complete after merge");
        assert_eq!(event.command, "ps aux");
        assert_eq!(event.session_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_login_enriches_subsequent_commands() {
        let mut parser = parser();
        parser.parse_line(
            "type=USER_LOGIN msg=audit(1700000002.000:44): ses=12 addr=192.168.1.77 \
             terminal=ssh res=success",
        );
        let line = format!(
            "type=EXECVE msg=audit(1700000002.100:45): ses=12 uid={NO_SUCH_UID} proctitle={}",
            hex("whoami")
        );
        let event = parser.parse_line(&line).expect("complete event");
        assert_eq!(event.source_ip.as_deref(), Some("192.168.1.77"));
    }

    #[test]
    fn test_logout_evicts_session() {
        let mut parser = parser();
        parser.parse_line(
            "type=USER_LOGIN msg=audit(1700000003.000:46): ses=12 addr=192.168.1.77 res=success",
        );
        parser.parse_line("type=USER_END msg=audit(1700000003.500:47): ses=12 res=success");
        let line = format!(
            "type=EXECVE msg=audit(1700000004.000:48): ses=12 uid={NO_SUCH_UID} proctitle={}",
            hex("whoami")
        );
        let event = parser.parse_line(&line).expect("complete event");
        assert!(event.source_ip.is_none());
    }

    #[test]
    fn test_failed_login_does_not_map_session() {
        let mut parser = parser();
        parser.parse_line(
            "type=USER_LOGIN msg=audit(1700000005.000:49): ses=13 addr=10.1.1.1 res=failed",
        );
        let line = format!(
            "type=EXECVE msg=audit(1700000005.100:50): ses=13 uid={NO_SUCH_UID} proctitle={}",
            hex("id")
        );
        let event = parser.parse_line(&line).expect("complete event");
        assert!(event.source_ip.is_none());
    }

    #[test]
    fn test_duplicate_audit_id_dropped() {
        let mut parser = parser();
        let line = format!(
            "type=EXECVE msg=audit(1700000006.000:51): ses=1 uid={NO_SUCH_UID} proctitle={}",
            hex("uptime")
        );
        assert!(parser.parse_line(&line).is_some());
        assert!(parser.parse_line(&line).is_none());
    }

    #[test]
    fn test_incomplete_record_never_emitted() {
        let mut parser = parser();
        // proctitle with no uid: user stays unresolved, record stays partial
        let line = format!(
            "type=PROCTITLE msg=audit(1700000007.000:52): proctitle={}",
            hex("ls")
        );
        assert!(parser.parse_line(&line).is_none());
        assert!(parser.parse_line("unrelated noise").is_none());
    }

    #[test]
    fn test_malformed_hex_keeps_raw_token() {
        let mut parser = parser();
        let line = format!(
            "type=EXECVE msg=audit(1700000008.000:53): ses=2 uid={NO_SUCH_UID} proctitle=ABC"
        );
        let event = parser.parse_line(&line).expect("event with raw token");
        assert_eq!(event.command, "ABC");
    }

    proptest! {
        #[test]
        fn prop_decode_then_reencode_is_idempotent(
            parts in prop::collection::vec("[a-z0-9/.-]{1,8}", 1..5)
        ) {
            let raw = parts.join("\0");
            let encoded: String = raw.bytes().map(|b| format!("{b:02x}")).collect();
            let decoded = decode_hex_command(&encoded);

            let reencoded: String = decoded.bytes().map(|b| format!("{b:02x}")).collect();
            prop_assert_eq!(decode_hex_command(&reencoded), decoded);
        }
    }
}
