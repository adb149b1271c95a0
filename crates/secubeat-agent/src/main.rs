//! SecuBeat - Linux Command Tracker
//!
//! Main entry point for the `secubeat` binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod app;
mod cli;
mod error;
mod logging;
mod render;
mod tracker;

use cli::Args;
use error::AgentError;

/// Application exit codes
#[repr(u8)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    IoError = 3,
    PrivilegeError = 4,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    match runtime.block_on(run(args)) {
        Ok(()) => Exit::Success.into(),
        Err(e) => {
            error!("{e}");
            eprintln!("secubeat: {e}");
            e.exit_code().into()
        }
    }
}

async fn run(args: Args) -> Result<(), AgentError> {
    if let Some(path) = &args.create_config {
        secubeat_config::create_default_config_file(path)?;
        println!("Default configuration created at: {}", path.display());
        return Ok(());
    }

    let loader = secubeat_config::ConfigLoader::new();
    let mut config = loader.load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    logging::init(&config);

    let agent = app::Agent::new(config)?;
    agent.run().await
}
