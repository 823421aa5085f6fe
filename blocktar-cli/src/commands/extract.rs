//! Extract command implementation.

use crate::utils::create_progress_bar;
use blocktar_archive::{EntryFilter, ExtractOptions, Outcome, extract_archive};
use blocktar_core::BLOCK_SIZE;
use std::fs;
use std::path::Path;

/// Command-line switches for extraction.
pub struct ExtractFlags<'a> {
    pub include: &'a [String],
    pub exclude: &'a [String],
    pub touch: bool,
    pub no_same_permissions: bool,
    pub progress: bool,
}

pub fn cmd_extract(
    archive: &Path,
    output: &Path,
    flags: &ExtractFlags,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ExtractOptions {
        filter: EntryFilter::new(flags.include, flags.exclude),
        preserve_mtime: !flags.touch,
        preserve_permissions: !flags.no_same_permissions,
        ..ExtractOptions::default()
    };

    let total = fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
    let pb = create_progress_bar(total, flags.progress);

    let summary = extract_archive(archive, output, &options, |line, outcome| {
        let consumed = (1 + line.header.data_blocks()) * BLOCK_SIZE as u64;
        if flags.progress {
            pb.inc(consumed);
            pb.set_message(line.header.name.clone());
        } else {
            match outcome {
                Outcome::Extracted => println!("{}", line),
                other => println!("{}  ({})", line, other),
            }
        }
    })?;
    pb.finish_and_clear();

    println!();
    println!("{}", summary);

    Ok(())
}
