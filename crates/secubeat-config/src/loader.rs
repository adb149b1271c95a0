//! Configuration file loading and parsing.

use crate::types::{OutputMode, SecubeatConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid JSON: {message}")]
    ParseError { message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },
}

/// Configuration loader.
///
/// Reads the first existing file from the ordered candidate list, applies
/// `SECUBEAT_*` environment overrides, then validates. A missing config
/// file is not an error; defaults apply.
pub struct ConfigLoader {
    candidates: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader over the standard candidate paths.
    pub fn new() -> Self {
        let mut candidates = vec![
            PathBuf::from("/etc/secu-beat/config.json"),
            PathBuf::from("/usr/local/etc/secu-beat/config.json"),
        ];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".secu-beat/config.json"));
        }
        candidates.push(PathBuf::from("./config.json"));
        Self { candidates }
    }

    /// Loader over explicit candidate paths.
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Load, apply environment overrides, validate.
    pub fn load(&self, explicit: Option<&Path>) -> Result<SecubeatConfig, ConfigError> {
        let mut config = match self.find_file(explicit) {
            Some(path) => {
                info!(path = %path.display(), "loading configuration");
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    message: e.to_string(),
                })?
            }
            None => {
                info!("no configuration file found, using defaults");
                SecubeatConfig::default()
            }
        };

        apply_env_overrides(&mut config);
        validate(&config)?;
        Ok(config)
    }

    fn find_file(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        self.candidates.iter().find(|path| path.exists()).cloned()
    }

    /// Save configuration as pretty-printed JSON.
    pub fn save(&self, config: &SecubeatConfig, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_env_overrides(config: &mut SecubeatConfig) {
    if let Ok(value) = std::env::var("SECUBEAT_SERVER_URL") {
        config.server.server_url = Some(value);
    }
    if let Ok(value) = std::env::var("SECUBEAT_SERVER_TOKEN") {
        config.server.server_token = Some(value);
    }
    if let Ok(value) = std::env::var("SECUBEAT_WEBHOOK_URL") {
        config.webhook.webhook_url = Some(value);
    }
    if let Ok(value) = std::env::var("SECUBEAT_WEBHOOK_SECRET") {
        config.webhook.webhook_secret = Some(value);
    }
    if let Ok(value) = std::env::var("SECUBEAT_SYSLOG_SERVER") {
        config.syslog.syslog_server = Some(value);
    }
    if let Ok(value) = std::env::var("SECUBEAT_OUTPUT_FILE") {
        config.output.output_file = value;
    }
    if let Ok(value) = std::env::var("SECUBEAT_LOG_LEVEL") {
        config.monitor.log_level = value;
    }
    if let Ok(value) = std::env::var("SECUBEAT_OUTPUT_MODE") {
        match value.as_str() {
            "console" => config.output.mode = OutputMode::Console,
            "json_file" => config.output.mode = OutputMode::JsonFile,
            "server" => config.output.mode = OutputMode::Server,
            other => warn!(value = %other, "ignoring invalid SECUBEAT_OUTPUT_MODE"),
        }
    }
    if let Ok(value) = std::env::var("SECUBEAT_VERIFY_SSL") {
        config.server.verify_ssl = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
    }
    debug!("applied environment overrides");
}

fn validate(config: &SecubeatConfig) -> Result<(), ConfigError> {
    if config.server.batch_size == 0 {
        return Err(ConfigError::ValidationError {
            message: "batch_size must be greater than 0".to_string(),
        });
    }
    if config.server.timeout == 0 {
        return Err(ConfigError::ValidationError {
            message: "timeout must be greater than 0".to_string(),
        });
    }
    if config.monitor.max_queued_events == 0 {
        return Err(ConfigError::ValidationError {
            message: "max_queued_events must be greater than 0".to_string(),
        });
    }
    if let Some(url) = &config.server.server_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError {
                message: "server_url must start with http:// or https://".to_string(),
            });
        }
    }
    if config.output.mode == OutputMode::Server && config.server.server_url.is_none() {
        return Err(ConfigError::ValidationError {
            message: "server_url is required when output mode is 'server'".to_string(),
        });
    }

    let valid_levels = ["trace", "debug", "info", "warn", "warning", "error"];
    if !valid_levels.contains(&config.monitor.log_level.to_lowercase().as_str()) {
        return Err(ConfigError::ValidationError {
            message: format!("invalid log_level: {}", config.monitor.log_level),
        });
    }

    Ok(())
}

/// Write a commented starter configuration to the given path.
pub fn create_default_config_file(path: &Path) -> Result<(), ConfigError> {
    let mut config = SecubeatConfig::default();
    config.server.server_url = Some("https://your-management-server.example/api/logs".to_string());
    config.server.server_token = Some("your-auth-token-here".to_string());
    config.filters.excluded_users = vec!["root".to_string()];

    ConfigLoader::new().save(&config, path)?;
    info!(path = %path.display(), "default configuration created");
    Ok(())
}
