//! Privileged live acquisition: streaming audit query subprocess.

use crate::parse::RecordParser;
use crate::SourceError;
use secubeat_types::CommandEvent;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Stream the audit query tool's text output, parsing records as they
/// arrive, until the stream ends or stop is signalled.
///
/// Returns `Ok(())` on cooperative stop and [`SourceError::StreamEnded`]
/// when the subprocess dies on its own, so the caller can fall back.
pub(crate) async fn run_live(
    ausearch: &Path,
    key: &str,
    parser: &mut RecordParser,
    tx: &mpsc::Sender<CommandEvent>,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), SourceError> {
    let mut child = Command::new(ausearch)
        .args(["-i", "-k", key, "--format", "text"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or(SourceError::StreamEnded)?;
    let mut lines = BufReader::new(stdout).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Some(event) = parser.parse_line(&line) {
                            if tx.send(event).await.is_err() {
                                let _ = child.kill().await;
                                return Ok(());
                            }
                        }
                    }
                    None => {
                        debug!("live audit stream reached end of output");
                        let _ = child.kill().await;
                        return Err(SourceError::StreamEnded);
                    }
                }
            }
            _ = stop.changed() => {
                let _ = child.kill().await;
                return Ok(());
            }
        }
    }
}
