//! Kernel audit rule installation.

use crate::SourceError;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default key tag applied to process-execution watch rules.
pub const DEFAULT_AUDIT_KEY: &str = "commands";

/// Installer for the process-execution watch rules.
///
/// One rule per supported instruction-set width, both tagged with the same
/// key so queries can select them.
pub struct AuditRules {
    auditctl: PathBuf,
    key: String,
}

impl AuditRules {
    /// Create an installer using the given control tool.
    pub fn new(auditctl: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            auditctl: auditctl.into(),
            key: key.into(),
        }
    }

    /// Install the b64 and b32 execve watch rules.
    ///
    /// Idempotent: the tool reporting an already-existing rule is treated
    /// as success.
    pub async fn install(&self) -> Result<(), SourceError> {
        for arch in ["b64", "b32"] {
            let arch_arg = format!("arch={arch}");
            let output = Command::new(&self.auditctl)
                .args([
                    "-a",
                    "always,exit",
                    "-F",
                    arch_arg.as_str(),
                    "-S",
                    "execve",
                    "-k",
                    self.key.as_str(),
                ])
                .output()
                .await?;

            if output.status.success() {
                debug!(arch, key = %self.key, "installed audit rule");
                continue;
            }

            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.to_lowercase().contains("exist") {
                debug!(arch, "audit rule already present");
                continue;
            }

            return Err(SourceError::ToolFailed {
                tool: self.auditctl.display().to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Check that at least one active rule references the execve syscall.
    pub async fn verify(&self) -> Result<bool, SourceError> {
        let output = Command::new(&self.auditctl).arg("-l").output().await?;
        if !output.status.success() {
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout).contains("execve"))
    }
}

/// Locate the first existing tool path from an ordered candidate list.
pub(crate) fn locate_tool(candidates: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates.iter().find(|path| path.exists()).cloned();
    if found.is_none() {
        warn!(candidates = ?candidates, "audit tool not found");
    }
    found
}

/// Whether the process runs with elevated privilege.
pub(crate) fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_tool_prefers_first_existing() {
        let missing = PathBuf::from("/definitely/not/here/auditctl");
        let existing = PathBuf::from("/"); // any path that exists
        assert_eq!(
            locate_tool(&[missing.clone(), existing.clone()]),
            Some(existing)
        );
        assert_eq!(locate_tool(&[missing]), None);
    }
}
