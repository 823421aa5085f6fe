//! Utility functions for the CLI.

use blocktar_archive::EntryLine;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Map `-v` occurrences to a default log filter. `RUST_LOG` still wins.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialise `env_logger` for the given verbosity.
pub fn init_logging(verbose: u8) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(verbose)))
        .format_timestamp(None)
        .init();
}

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Create an entry counter for operations whose total is not known upfront.
pub fn create_spinner(enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {pos} entries {msg}")
            .expect("spinner template is valid"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize)]
pub struct EntryJson {
    pub index: u64,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub mode: u32,
    pub permissions: String,
    pub uid: u32,
    pub gid: u32,
    pub mtime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkname: Option<String>,
    pub damaged: bool,
    pub truncated: bool,
}

impl EntryJson {
    pub fn from_line(line: &EntryLine) -> Self {
        let header = &line.header;
        Self {
            index: line.index,
            name: header.name.clone(),
            size: header.size,
            kind: header.typeflag.name().to_string(),
            mode: header.mode.bits(),
            permissions: header.permission_string(),
            uid: header.uid,
            gid: header.gid,
            mtime: header.mtime,
            linkname: (!header.linkname.is_empty()).then(|| header.linkname.clone()),
            damaged: header.damaged,
            truncated: header.truncated,
        }
    }
}

/// JSON summary counters.
#[derive(Debug, Serialize)]
pub struct SummaryJson {
    pub entries: u64,
    pub total_size: u64,
    pub damaged: u64,
    pub damaged_size: u64,
    pub truncated: u64,
}

/// JSON output for archive listing.
#[derive(Debug, Serialize)]
pub struct ArchiveListJson {
    pub archive: String,
    pub entries: Vec<EntryJson>,
    pub summary: SummaryJson,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocktar_archive::header::{FileMetadata, decode, encode};

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0), "warn");
        assert_eq!(log_filter(1), "info");
        assert_eq!(log_filter(2), "debug");
        assert_eq!(log_filter(9), "debug");
    }

    #[test]
    fn test_entry_json() {
        let meta = FileMetadata::regular("docs/a.md", 42, 0o640, 1_700_000_000);
        let header = decode(&encode(&meta).unwrap().block);
        let json = EntryJson::from_line(&EntryLine { index: 1, header });

        let value = serde_json::to_value(&json).unwrap();
        assert_eq!(value["name"], "docs/a.md");
        assert_eq!(value["size"], 42);
        assert_eq!(value["mode"], 0o640);
        assert_eq!(value["permissions"], "-rw-r-----");
        assert!(value.get("linkname").is_none());
        assert_eq!(value["damaged"], false);
    }

    #[test]
    fn test_hidden_progress() {
        assert!(create_progress_bar(10, false).is_hidden());
        assert!(create_spinner(false).is_hidden());
    }
}
