//! List command implementation.

use crate::utils::{ArchiveListJson, EntryJson, SummaryJson};
use blocktar_archive::{EntryFilter, ListOptions, list_archive};
use std::path::Path;

pub fn cmd_list(
    archive: &Path,
    json: bool,
    include: &[String],
    exclude: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ListOptions {
        filter: EntryFilter::new(include, exclude),
        ..ListOptions::default()
    };

    if json {
        return cmd_list_json(archive, &options);
    }

    println!("Archive: {}", archive.display());
    println!();
    let summary = list_archive(archive, &options, |line| println!("{}", line))?;
    println!();
    println!("{}", summary);

    Ok(())
}

/// Output archive listing as JSON.
fn cmd_list_json(archive: &Path, options: &ListOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = Vec::new();
    let summary = list_archive(archive, options, |line| entries.push(EntryJson::from_line(line)))?;

    let output = ArchiveListJson {
        archive: archive.display().to_string(),
        entries,
        summary: SummaryJson {
            entries: summary.entries,
            total_size: summary.total_size,
            damaged: summary.damaged,
            damaged_size: summary.damaged_size,
            truncated: summary.truncated,
        },
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
