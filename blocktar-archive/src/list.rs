//! Read-only archive listing.

use crate::filter::EntryFilter;
use crate::report::{ArchiveSummary, EntryLine};
use crate::stream::BlockStream;
use crate::validate::{has_end_marker, validate_archive};
use blocktar_core::block::{DEFAULT_CHUNK_SIZE, END_MARKER_LEN};
use blocktar_core::error::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Options for listing archive contents.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Read chunk size.
    pub chunk_size: usize,
    /// Entries to report; others are neither reported nor counted.
    pub filter: EntryFilter,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter: EntryFilter::default(),
        }
    }
}

/// List every entry of the archive at `path`.
///
/// Runs the pre-flight checks, then streams the archive minus its trailing
/// end-of-archive marker, calling `on_entry` once per selected entry.
pub fn list_archive<F>(path: &Path, options: &ListOptions, on_entry: F) -> Result<ArchiveSummary>
where
    F: FnMut(&EntryLine),
{
    let len = validate_archive(path)?;
    let mut file = File::open(path)?;
    if !has_end_marker(&mut file, len)? {
        log::warn!(
            "{}: last two blocks are not zero, archive may be truncated",
            path.display()
        );
    }
    file.seek(SeekFrom::Start(0))?;

    log::info!("listing {}", path.display());
    let body = file.take(len - END_MARKER_LEN as u64);
    list_stream(body, options, on_entry)
}

/// List entries from an archive body that has already been validated.
pub fn list_stream<R, F>(reader: R, options: &ListOptions, mut on_entry: F) -> Result<ArchiveSummary>
where
    R: Read,
    F: FnMut(&EntryLine),
{
    let mut stream = BlockStream::with_chunk_size(reader, options.chunk_size);
    let mut summary = ArchiveSummary::default();
    let mut index = 0u64;

    while let Some(header) = stream.next_header()? {
        index += 1;
        if !options.filter.matches(&header.name) {
            continue;
        }
        if header.damaged {
            log::warn!("entry {} '{}': checksum mismatch", index, header.name);
        }
        summary.record(&header);
        on_entry(&EntryLine { index, header });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{FileMetadata, encode};
    use blocktar_core::block::BLOCK_SIZE;
    use std::io::Cursor;

    fn body(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in entries {
            let meta = FileMetadata::regular(*name, data.len() as u64, 0o644, 0);
            out.extend_from_slice(&encode(&meta).unwrap().block);
            out.extend_from_slice(data);
            out.resize(out.len().next_multiple_of(BLOCK_SIZE), 0);
        }
        out
    }

    #[test]
    fn test_list_stream() {
        let data = body(&[("one.txt", b"1"), ("two.txt", &[2u8; 700])]);
        let mut names = Vec::new();
        let summary = list_stream(Cursor::new(data), &ListOptions::default(), |line| {
            names.push((line.index, line.header.name.clone()))
        })
        .unwrap();

        assert_eq!(names, vec![(1, "one.txt".into()), (2, "two.txt".into())]);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.total_size, 701);
        assert_eq!(summary.damaged, 0);
    }

    #[test]
    fn test_list_counts_damaged() {
        let mut data = body(&[("ok.txt", b"fine"), ("bad.txt", b"broken")]);
        // corrupt the second header's name
        data[2 * BLOCK_SIZE] = b'B';
        let summary = list_stream(Cursor::new(data), &ListOptions::default(), |_| {}).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.damaged, 1);
        assert_eq!(summary.damaged_size, 6);
    }

    #[test]
    fn test_list_filtered() {
        let data = body(&[("a.txt", b"a"), ("b.log", b"b")]);
        let options = ListOptions {
            filter: EntryFilter::new(&["*.log".to_string()], &[]),
            ..ListOptions::default()
        };
        let mut seen = Vec::new();
        let summary = list_stream(Cursor::new(data), &options, |line| seen.push(line.index)).unwrap();
        assert_eq!(seen, vec![2]);
        assert_eq!(summary.entries, 1);
    }
}
