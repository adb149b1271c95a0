//! Session-to-network-origin correlation.
//!
//! Maps kernel-assigned session ids to the IP address a session logged in
//! from, so bare command events can be enriched with their origin. Session
//! ids are reused by the kernel; a newer login for the same id overwrites
//! any stale mapping.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Session id to source IP map with interior mutual exclusion.
///
/// Owned by the audit event source for its lifetime and shared with nothing
/// else except housekeeping paths. Absence of a mapping is a normal state:
/// most commands have no known origin yet.
#[derive(Debug, Default)]
pub struct SessionCorrelator {
    sessions: Mutex<HashMap<String, String>>,
}

impl SessionCorrelator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful login, inserting or overwriting the mapping.
    pub fn record_login(&self, session_id: impl Into<String>, ip: impl Into<String>) {
        let session_id = session_id.into();
        let ip = ip.into();
        debug!(session_id = %session_id, ip = %ip, "mapped session to origin");
        self.sessions.lock().insert(session_id, ip);
    }

    /// Record a logout, evicting the mapping if present. No-op otherwise.
    pub fn record_logout(&self, session_id: &str) {
        if self.sessions.lock().remove(session_id).is_some() {
            debug!(session_id = %session_id, "removed session mapping");
        }
    }

    /// Look up the origin address for a session id.
    pub fn lookup(&self, session_id: &str) -> Option<String> {
        self.sessions.lock().get(session_id).cloned()
    }

    /// Number of live session mappings.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no sessions are currently mapped.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_then_lookup() {
        let correlator = SessionCorrelator::new();
        correlator.record_login("17", "192.168.1.50");
        assert_eq!(correlator.lookup("17").as_deref(), Some("192.168.1.50"));
        assert_eq!(correlator.lookup("18"), None);
    }

    #[test]
    fn test_logout_evicts() {
        let correlator = SessionCorrelator::new();
        correlator.record_login("17", "192.168.1.50");
        correlator.record_logout("17");
        assert_eq!(correlator.lookup("17"), None);
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_logout_of_unknown_session_is_noop() {
        let correlator = SessionCorrelator::new();
        correlator.record_logout("99");
        assert!(correlator.is_empty());
    }

    #[test]
    fn test_reused_session_id_overwrites_stale_mapping() {
        let correlator = SessionCorrelator::new();
        correlator.record_login("17", "192.168.1.50");
        correlator.record_login("17", "10.0.0.9");
        assert_eq!(correlator.lookup("17").as_deref(), Some("10.0.0.9"));
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn test_lookup_tracks_most_recent_unclosed_login() {
        let correlator = SessionCorrelator::new();
        let pairs = [("1", "10.0.0.1"), ("2", "10.0.0.2"), ("3", "10.0.0.3")];
        for (ses, ip) in pairs {
            correlator.record_login(ses, ip);
        }
        correlator.record_logout("2");

        assert_eq!(correlator.lookup("1").as_deref(), Some("10.0.0.1"));
        assert_eq!(correlator.lookup("2"), None);
        assert_eq!(correlator.lookup("3").as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let correlator = Arc::new(SessionCorrelator::new());
        let mut handles = Vec::new();

        for t in 0..4 {
            let correlator = Arc::clone(&correlator);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    let ses = format!("{}", t * 100 + i);
                    correlator.record_login(&ses, "10.0.0.1");
                    correlator.lookup(&ses);
                    correlator.record_logout(&ses);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(correlator.is_empty());
    }
}
