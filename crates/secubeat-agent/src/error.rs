//! Agent-level errors and their exit codes.

use crate::Exit;
use secubeat_config::ConfigError;
use secubeat_deliver::SinkError;
use thiserror::Error;

/// Errors that terminate the agent at startup or shutdown.
///
/// Nothing inside event acquisition or delivery surfaces here; those paths
/// degrade and keep running.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("sink setup failed: {0}")]
    Sink(#[from] SinkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SecuBeat requires root privileges to access audit logs")]
    PrivilegeRequired,
}

impl AgentError {
    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> Exit {
        match self {
            Self::Config(_) => Exit::ConfigError,
            Self::Io(_) => Exit::IoError,
            Self::PrivilegeRequired => Exit::PrivilegeError,
            Self::Sink(_) => Exit::GeneralError,
        }
    }
}
