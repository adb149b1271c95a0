//! CLI argument definitions using clap derive macros.

use clap::{Parser, ValueEnum, ValueHint};
use secubeat_config::{OutputMode, SecubeatConfig};
use std::path::PathBuf;

/// SecuBeat - Linux Command Tracker
///
/// Observes command execution via the kernel audit subsystem and forwards
/// structured event records to configured sinks.
#[derive(Debug, Parser)]
#[command(name = "secubeat", author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SECUBEAT_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Output mode
    #[arg(short, long, value_enum)]
    pub output: Option<OutputModeArg>,

    /// Management server URL
    #[arg(long)]
    pub server_url: Option<String>,

    /// Authentication token for the server
    #[arg(long)]
    pub server_token: Option<String>,

    /// Output file path for json_file mode
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub output_file: Option<PathBuf>,

    /// Logging level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print events as JSON in console mode
    #[arg(long)]
    pub json_output: bool,

    /// Create a default configuration file at the given path and exit
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub create_config: Option<PathBuf>,
}

/// CLI spelling of the output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum OutputModeArg {
    Console,
    JsonFile,
    Server,
}

impl From<OutputModeArg> for OutputMode {
    fn from(arg: OutputModeArg) -> Self {
        match arg {
            OutputModeArg::Console => OutputMode::Console,
            OutputModeArg::JsonFile => OutputMode::JsonFile,
            OutputModeArg::Server => OutputMode::Server,
        }
    }
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut SecubeatConfig) {
        if let Some(mode) = self.output {
            config.output.mode = mode.into();
        }
        if let Some(url) = &self.server_url {
            config.server.server_url = Some(url.clone());
        }
        if let Some(token) = &self.server_token {
            config.server.server_token = Some(token.clone());
        }
        if let Some(path) = &self.output_file {
            config.output.output_file = path.display().to_string();
        }
        if let Some(level) = &self.log_level {
            config.monitor.log_level = level.clone();
        }
        if self.json_output {
            config.output.json_output = true;
        }
    }
}
