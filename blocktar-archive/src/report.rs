//! Per-entry lines and summary counters shared by all operations.

use crate::header::HeaderRecord;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

/// Timestamp format used in entry lines (always UTC).
pub const LIST_TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]/[month padding:zero]/[day padding:zero] [hour padding:zero]:[minute padding:zero]:[second padding:zero]"
);

/// Format a Unix timestamp for listings.
pub fn format_mtime(mtime: u64) -> String {
    i64::try_from(mtime)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|t| t.format(LIST_TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| mtime.to_string())
}

/// One reported entry: a 1-based sequence number and its header.
#[derive(Debug, Clone)]
pub struct EntryLine {
    /// Position of the entry in the archive, starting at 1.
    pub index: u64,
    /// The entry's header.
    pub header: HeaderRecord,
}

impl fmt::Display for EntryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6} {} {}  {}  ({} bytes)",
            self.index,
            self.header.permission_string(),
            format_mtime(self.header.mtime),
            self.header.display_name(),
            self.header.size
        )?;
        if self.header.damaged {
            f.write_str(" [damaged]")?;
        }
        if self.header.truncated {
            f.write_str(" [truncated]")?;
        }
        Ok(())
    }
}

/// Counters for list, create and append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entries seen or written.
    pub entries: u64,
    /// Sum of entry sizes.
    pub total_size: u64,
    /// Entries whose checksum did not verify, or whose source changed while being written.
    pub damaged: u64,
    /// Sum of damaged entry sizes.
    pub damaged_size: u64,
    /// Entries with a truncated name.
    pub truncated: u64,
}

impl ArchiveSummary {
    /// Count one entry.
    pub fn record(&mut self, header: &HeaderRecord) {
        self.entries += 1;
        self.total_size += header.size;
        if header.damaged {
            self.damaged += 1;
            self.damaged_size += header.size;
        }
        if header.truncated {
            self.truncated += 1;
        }
    }
}

impl fmt::Display for ArchiveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} bytes; {} damaged ({} bytes); {} truncated names",
            self.entries, self.total_size, self.damaged, self.damaged_size, self.truncated
        )
    }
}
