//! Passive tail acquisition: follow an audit log file.

use crate::parse::RecordParser;
use crate::SourceError;
use secubeat_types::CommandEvent;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};

/// Pick the most specific readable file from the ordered candidate list.
pub(crate) fn first_readable(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|path| std::fs::File::open(path).is_ok())
        .cloned()
}

/// Continuously read newly appended lines from the log file, parsing
/// execution records as they arrive. Starts at end-of-file; rewinds on
/// truncation. Returns on cooperative stop.
pub(crate) async fn follow(
    path: &Path,
    poll_interval: Duration,
    parser: &mut RecordParser,
    tx: &mpsc::Sender<CommandEvent>,
    stop: &mut watch::Receiver<bool>,
) -> Result<(), SourceError> {
    let mut file = File::open(path).await?;
    let mut pos = file.seek(SeekFrom::End(0)).await?;
    let mut pending = String::new();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop.changed() => return Ok(()),
            _ = ticker.tick() => {
                let len = file.metadata().await?.len();
                if len < pos {
                    // Truncated or rotated in place; start over.
                    pos = file.seek(SeekFrom::Start(0)).await?;
                    pending.clear();
                }
                if len > pos {
                    let mut buf = vec![0u8; (len - pos) as usize];
                    file.read_exact(&mut buf).await?;
                    pos = len;
                    pending.push_str(&String::from_utf8_lossy(&buf));

                    while let Some(newline) = pending.find('\n') {
                        let line: String = pending.drain(..=newline).collect();
                        if let Some(event) = parser.parse_line(&line) {
                            if tx.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }
}
