//! Configuration loading and validation.
//!
//! Fatal at startup by design: a bad configuration stops the agent before
//! any monitoring begins, unlike acquisition and delivery errors which
//! always degrade gracefully.

mod loader;
mod types;

pub use loader::{create_default_config_file, ConfigError, ConfigLoader};
pub use types::{
    FilterSettings, MonitorSettings, OutputMode, OutputSettings, SecubeatConfig, ServerSettings,
    SyslogSettings, WebhookSettings,
};
