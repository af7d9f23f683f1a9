use std::io::{IsTerminal, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sbus_transport::Message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DescriptorOutput {
    fd: i32,
    target: String,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    channel: &'a str,
    n_files: usize,
    files: Vec<DescriptorOutput>,
    metadata: String,
    payload: String,
    timestamp: String,
}

pub fn print_message(message: &Message, channel: &str, format: OutputFormat) {
    let files: Vec<DescriptorOutput> = message
        .descriptors
        .iter()
        .map(|fd| DescriptorOutput {
            fd: fd.as_raw_fd(),
            target: describe_fd(fd),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                channel,
                n_files: files.len(),
                files,
                metadata: preview(message.metadata.as_ref()),
                payload: preview(message.payload.as_ref()),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let targets = files
                .iter()
                .map(|file| format!("{} -> {}", file.fd, file.target))
                .collect::<Vec<_>>()
                .join("\n");
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FILES", "DESCRIPTORS", "METADATA", "PAYLOAD"])
                .add_row(vec![
                    files.len().to_string(),
                    targets,
                    preview(message.metadata.as_ref()),
                    preview(message.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "files={} metadata={} payload={}",
                files.len(),
                preview(message.metadata.as_ref()),
                preview(message.payload.as_ref())
            );
            for file in &files {
                println!("  fd {} -> {}", file.fd, file.target);
            }
        }
        OutputFormat::Raw => {
            print_raw(message.payload.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// What a received descriptor points at, as far as the platform tells us.
fn describe_fd(fd: &OwnedFd) -> String {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        let link = format!("/proc/self/fd/{}", fd.as_raw_fd());
        if let Ok(target) = std::fs::read_link(link) {
            return target.display().to_string();
        }
    }
    match fd.try_clone().map(std::fs::File::from).and_then(|f| f.metadata()) {
        Ok(meta) if meta.is_file() => format!("<file {} bytes>", meta.len()),
        Ok(meta) if meta.is_dir() => "<directory>".to_string(),
        Ok(_) => "<special>".to_string(),
        Err(_) => "<unknown>".to_string(),
    }
}

fn preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_marks_binary_content() {
        assert_eq!(preview(br#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }

    #[test]
    fn describe_fd_names_regular_files() {
        let fd = OwnedFd::from(std::fs::File::open("/dev/null").unwrap());
        let text = describe_fd(&fd);
        assert!(!text.is_empty());
        assert_ne!(text, "<unknown>");
    }
}
