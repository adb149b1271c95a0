//! Strategy selection and the public source surface.

use crate::parse::RecordParser;
use crate::rules::{is_root, locate_tool, AuditRules, DEFAULT_AUDIT_KEY};
use crate::{demo, history, live, tail};
use secubeat_correlate::SessionCorrelator;
use secubeat_types::CommandEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Which acquisition strategy is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Watch rules installed, streaming the live audit query tool.
    PrivilegedLive,
    /// Bounded recent-window query (transitions into tail afterwards).
    Historical,
    /// Following an audit log file.
    PassiveTail,
    /// Synthesizing demo events.
    Demo,
}

/// Audit source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Key tag selecting the watch rules.
    pub audit_key: String,
    /// Whether to attempt rule installation at all.
    pub enable_audit_rules: bool,
    /// Ordered candidate paths for the audit control tool.
    pub auditctl_candidates: Vec<PathBuf>,
    /// Ordered candidate paths for the audit query tool.
    pub ausearch_candidates: Vec<PathBuf>,
    /// Ordered candidate paths for passive tail mode.
    pub log_candidates: Vec<PathBuf>,
    /// Poll interval for tail mode.
    pub poll_interval: Duration,
    /// Capacity of the outgoing event channel.
    pub channel_capacity: usize,
    /// Min/max delay between synthetic demo events.
    pub demo_interval: (Duration, Duration),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            audit_key: DEFAULT_AUDIT_KEY.to_string(),
            enable_audit_rules: true,
            auditctl_candidates: vec![
                PathBuf::from("/sbin/auditctl"),
                PathBuf::from("/usr/sbin/auditctl"),
            ],
            ausearch_candidates: vec![
                PathBuf::from("/sbin/ausearch"),
                PathBuf::from("/usr/sbin/ausearch"),
            ],
            log_candidates: vec![
                PathBuf::from("/var/log/audit/audit.log"),
                PathBuf::from("/var/log/audit.log"),
                PathBuf::from("/var/log/messages"),
                PathBuf::from("/var/log/syslog"),
            ],
            poll_interval: Duration::from_millis(250),
            channel_capacity: 1024,
            demo_interval: (Duration::from_secs(2), Duration::from_secs(8)),
        }
    }
}

/// The produced event sequence.
pub struct EventStream {
    rx: mpsc::Receiver<CommandEvent>,
}

impl EventStream {
    /// Receive the next event; `None` once the source has stopped.
    pub async fn recv(&mut self) -> Option<CommandEvent> {
        self.rx.recv().await
    }
}

/// Control handle for a running source.
#[derive(Clone)]
pub struct SourceHandle {
    stop: Arc<watch::Sender<bool>>,
    mode: watch::Receiver<Option<SourceMode>>,
}

impl SourceHandle {
    /// Request the source to stop. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// The currently active mode, if one has been selected yet.
    pub fn mode(&self) -> Option<SourceMode> {
        *self.mode.borrow()
    }

    /// Wait until a strategy has been selected and return it.
    ///
    /// Returns `None` if the source task exited before selecting one.
    pub async fn active_mode(&mut self) -> Option<SourceMode> {
        loop {
            if let Some(mode) = *self.mode.borrow() {
                return Some(mode);
            }
            if self.mode.changed().await.is_err() {
                return *self.mode.borrow();
            }
        }
    }
}

/// The audit event source.
pub struct AuditSource;

impl AuditSource {
    /// Start acquiring events, selecting the best usable strategy.
    ///
    /// The source exclusively owns the correlator's contents for its
    /// lifetime: it records logins/logouts and enriches execution events
    /// with the correlated origin.
    pub fn start(
        config: SourceConfig,
        correlator: Arc<SessionCorrelator>,
    ) -> (EventStream, SourceHandle) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (mode_tx, mode_rx) = watch::channel(None);

        tokio::spawn(run_chain(config, correlator, tx, stop_rx, mode_tx));

        (
            EventStream { rx },
            SourceHandle {
                stop: Arc::new(stop_tx),
                mode: mode_rx,
            },
        )
    }
}

async fn run_chain(
    config: SourceConfig,
    correlator: Arc<SessionCorrelator>,
    tx: mpsc::Sender<CommandEvent>,
    mut stop: watch::Receiver<bool>,
    mode: watch::Sender<Option<SourceMode>>,
) {
    let mut parser = RecordParser::new(correlator);

    // Strategy 1: privileged live streaming.
    if config.enable_audit_rules && is_root() {
        if let Some(auditctl) = locate_tool(&config.auditctl_candidates) {
            let rules = AuditRules::new(auditctl, &config.audit_key);
            match rules.install().await {
                Ok(()) => {
                    match rules.verify().await {
                        Ok(true) => debug!("execve watch rule active"),
                        _ => warn!("no active execve rule found; source may yield nothing"),
                    }
                    if let Some(ausearch) = locate_tool(&config.ausearch_candidates) {
                        mode.send_replace(Some(SourceMode::PrivilegedLive));
                        info!("audit source running in privileged live mode");
                        match live::run_live(
                            &ausearch,
                            &config.audit_key,
                            &mut parser,
                            &tx,
                            &mut stop,
                        )
                        .await
                        {
                            Ok(()) => return,
                            Err(e) => warn!(error = %e, "live audit stream failed, falling back"),
                        }
                    }
                }
                Err(e) => warn!(error = %e, "audit rule install failed, falling back"),
            }
        }
    } else {
        debug!("privileged live mode unavailable");
    }
    if *stop.borrow() {
        return;
    }

    // Strategy 2: bounded historical query. Whatever it yields is emitted
    // and the source continues into tail mode; the parser's dedup ring
    // keeps the overlap from being delivered twice.
    if let Some(ausearch) = locate_tool(&config.ausearch_candidates) {
        match history::query_recent(&ausearch, &config.audit_key, &mut parser).await {
            Ok(events) if !events.is_empty() => {
                mode.send_replace(Some(SourceMode::Historical));
                info!(count = events.len(), "recovered recent events from audit query");
                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Ok(_) => debug!("audit query returned no parseable records"),
            Err(e) => warn!(error = %e, "audit query failed, falling back"),
        }
    }
    if *stop.borrow() {
        return;
    }

    // Strategy 3: passive tail.
    if let Some(path) = tail::first_readable(&config.log_candidates) {
        mode.send_replace(Some(SourceMode::PassiveTail));
        info!(path = %path.display(), "audit source following log file");
        match tail::follow(&path, config.poll_interval, &mut parser, &tx, &mut stop).await {
            Ok(()) => return,
            Err(e) => warn!(error = %e, "log follow failed, falling back to demo mode"),
        }
    }
    if *stop.borrow() {
        return;
    }

    // Strategy 4: demo events. Never fails.
    mode.send_replace(Some(SourceMode::Demo));
    warn!("no usable audit source, generating demo events");
    demo::run_demo(config.demo_interval, &tx, &mut stop).await;
}
