//! Configuration types.

use serde::{Deserialize, Serialize};

/// Where formatted events are written locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Pretty-print to the console.
    Console,
    /// Append JSON lines to a file.
    JsonFile,
    /// Network sinks only.
    Server,
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecubeatConfig {
    /// Local output settings.
    pub output: OutputSettings,
    /// Management server sink settings.
    pub server: ServerSettings,
    /// Webhook sink settings.
    pub webhook: WebhookSettings,
    /// Syslog sink settings.
    pub syslog: SyslogSettings,
    /// Event filtering rules.
    pub filters: FilterSettings,
    /// Monitoring behavior.
    pub monitor: MonitorSettings,
}

impl Default for SecubeatConfig {
    fn default() -> Self {
        Self {
            output: OutputSettings::default(),
            server: ServerSettings::default(),
            webhook: WebhookSettings::default(),
            syslog: SyslogSettings::default(),
            filters: FilterSettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

/// Local output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output mode.
    pub mode: OutputMode,
    /// Target file for `json_file` mode.
    pub output_file: String,
    /// Colorize console output.
    pub use_colors: bool,
    /// Print JSON instead of the pretty line in console mode.
    pub json_output: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            mode: OutputMode::Console,
            output_file: "/var/log/secu-beat.log".to_string(),
            use_colors: true,
            json_output: false,
        }
    }
}

/// Management server sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Endpoint receiving batch envelopes; sink disabled when unset.
    pub server_url: Option<String>,
    /// Bearer token.
    pub server_token: Option<String>,
    /// Verify TLS certificates.
    pub verify_ssl: bool,
    /// Events per batch.
    pub batch_size: usize,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Attempts per batch.
    pub retry_attempts: u32,
    /// Base retry delay in seconds (linear backoff).
    pub retry_delay: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            server_url: None,
            server_token: None,
            verify_ssl: true,
            batch_size: 10,
            timeout: 30,
            retry_attempts: 3,
            retry_delay: 5,
        }
    }
}

/// Webhook sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// Webhook endpoint; sink disabled when unset.
    pub webhook_url: Option<String>,
    /// Shared secret for the HMAC signature header.
    pub webhook_secret: Option<String>,
}

/// Syslog sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogSettings {
    /// Syslog server; sink disabled when unset.
    pub syslog_server: Option<String>,
    /// UDP port.
    pub syslog_port: u16,
}

impl Default for SyslogSettings {
    fn default() -> Self {
        Self {
            syslog_server: None,
            syslog_port: 514,
        }
    }
}

/// Event filtering rules. Exclusion always wins over inclusion; `"*"`
/// in an included list matches everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub included_users: Vec<String>,
    pub excluded_users: Vec<String>,
    pub included_commands: Vec<String>,
    pub excluded_commands: Vec<String>,
    pub included_ips: Vec<String>,
    pub excluded_ips: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            included_users: vec!["*".to_string()],
            excluded_users: Vec::new(),
            included_commands: vec!["*".to_string()],
            excluded_commands: Vec::new(),
            included_ips: vec!["*".to_string()],
            excluded_ips: Vec::new(),
        }
    }
}

/// Monitoring behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Log level for the agent itself.
    pub log_level: String,
    /// Attempt kernel audit rule installation.
    pub enable_audit_rules: bool,
    /// Key tag selecting the watch rules.
    pub audit_key: String,
    /// Refuse to start without elevated privilege.
    pub require_root: bool,
    /// In-memory command history size.
    pub max_events_memory: usize,
    /// Per-sink intake queue capacity.
    pub max_queued_events: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_audit_rules: true,
            audit_key: "commands".to_string(),
            require_root: true,
            max_events_memory: 1000,
            max_queued_events: 10_000,
        }
    }
}
