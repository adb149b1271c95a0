//! Unprivileged historical acquisition: bounded recent-window audit query.

use crate::parse::RecordParser;
use crate::SourceError;
use secubeat_types::CommandEvent;
use std::path::Path;
use tokio::process::Command;

/// Query the audit subsystem for events already tagged with the key over a
/// bounded recent window.
///
/// A non-zero exit status is an error; an empty result is not — the caller
/// decides whether to fall through.
pub(crate) async fn query_recent(
    ausearch: &Path,
    key: &str,
    parser: &mut RecordParser,
) -> Result<Vec<CommandEvent>, SourceError> {
    let output = Command::new(ausearch)
        .args(["-i", "-k", key, "-ts", "recent", "--format", "text"])
        .output()
        .await?;

    if !output.status.success() {
        return Err(SourceError::ToolFailed {
            tool: ausearch.display().to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter_map(|line| parser.parse_line(line))
        .collect())
}
