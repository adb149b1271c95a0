//! Local event rendering: console pretty-print, console JSON, JSON-lines
//! file output.

use secubeat_config::{OutputMode, OutputSettings};
use secubeat_types::WireEvent;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const CYAN: &str = "\x1b[96m";
const BLUE: &str = "\x1b[94m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const RED: &str = "\x1b[91m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Writes formatted events to the configured local output.
pub enum OutputWriter {
    Console { use_colors: bool, json: bool },
    File(File),
    /// Server mode: network sinks only, nothing local.
    Quiet,
}

impl OutputWriter {
    /// Build a writer from the output settings.
    pub fn from_settings(settings: &OutputSettings) -> std::io::Result<Self> {
        match settings.mode {
            OutputMode::Console => Ok(Self::Console {
                use_colors: settings.use_colors,
                json: settings.json_output,
            }),
            OutputMode::JsonFile => {
                let path = Path::new(&settings.output_file);
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Self::File(file))
            }
            OutputMode::Server => Ok(Self::Quiet),
        }
    }

    /// Write one event.
    pub fn write(&mut self, event: &WireEvent) -> std::io::Result<()> {
        match self {
            Self::Console { use_colors, json } => {
                if *json {
                    let rendered = serde_json::to_string_pretty(event)
                        .map_err(std::io::Error::other)?;
                    println!("{rendered}");
                } else if *use_colors {
                    println!("{}", colored_line(event));
                } else {
                    println!("{}", plain_line(event));
                }
                Ok(())
            }
            Self::File(file) => {
                let rendered = serde_json::to_string(event).map_err(std::io::Error::other)?;
                writeln!(file, "{rendered}")?;
                file.flush()
            }
            Self::Quiet => Ok(()),
        }
    }
}

fn exit_label(event: &WireEvent) -> String {
    event
        .exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn plain_line(event: &WireEvent) -> String {
    format!(
        "[{}] {}@{} $ {} (exit: {})",
        event.timestamp.to_rfc3339(),
        event.user,
        event.source_ip,
        event.command,
        exit_label(event)
    )
}

fn colored_line(event: &WireEvent) -> String {
    let status_color = match event.exit_code {
        Some(0) => GREEN,
        Some(_) => RED,
        None => YELLOW,
    };
    format!(
        "{CYAN}[{}]{RESET} {BLUE}{}@{}{RESET} {BOLD}${RESET} {} {status_color}(exit: {}){RESET}",
        event.timestamp.to_rfc3339(),
        event.user,
        event.source_ip,
        event.command,
        exit_label(event)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secubeat_types::{CommandEvent, EventKind};

    fn wire(exit_code: Option<i32>) -> WireEvent {
        let mut builder = CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command("ls -la")
            .source_ip("10.0.0.5");
        if let Some(code) = exit_code {
            builder = builder.exit_code(code);
        }
        WireEvent::from_event(&builder.build())
    }

    #[test]
    fn test_plain_line_shape() {
        let line = plain_line(&wire(Some(0)));
        assert!(line.contains("alice@10.0.0.5"));
        assert!(line.contains("$ ls -la"));
        assert!(line.ends_with("(exit: 0)"));
    }

    #[test]
    fn test_missing_exit_code_renders_na() {
        let line = plain_line(&wire(None));
        assert!(line.ends_with("(exit: N/A)"));
    }

    #[test]
    fn test_file_writer_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/events.log");
        let settings = OutputSettings {
            mode: OutputMode::JsonFile,
            output_file: path.display().to_string(),
            use_colors: false,
            json_output: false,
        };

        let mut writer = OutputWriter::from_settings(&settings).unwrap();
        writer.write(&wire(Some(0))).unwrap();
        writer.write(&wire(Some(1))).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["user"], "alice");
        }
    }
}
