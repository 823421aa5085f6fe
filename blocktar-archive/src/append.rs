//! Adding entries to the end of an existing archive.
//!
//! The end-of-archive marker is cut off, new entries are written in its
//! place and a fresh marker follows. A failure in between leaves the archive
//! without a marker.

use crate::create::{CreateOptions, collect_sources};
use crate::report::{ArchiveSummary, EntryLine};
use crate::validate::{has_end_marker, require_tar_extension, validate_archive};
use crate::writer::ArchiveWriter;
use blocktar_core::block::END_MARKER_LEN;
use blocktar_core::error::{Result, TarError};
use std::fs::OpenOptions;
use std::io::{BufWriter, Seek, SeekFrom};
use std::path::Path;

/// Append `sources` to the archive at `target`.
///
/// The archive must pass the same checks as for listing and must end with
/// an end-of-archive marker. Returns counters for the new entries only.
pub fn append_archive<P, F>(
    target: &Path,
    sources: &[P],
    options: &CreateOptions,
    mut on_entry: F,
) -> Result<ArchiveSummary>
where
    P: AsRef<Path>,
    F: FnMut(&EntryLine),
{
    require_tar_extension(target)?;
    let len = validate_archive(target)?;
    let files = collect_sources(target, sources)?;

    let mut file = OpenOptions::new().read(true).write(true).open(target)?;
    if !has_end_marker(&mut file, len)? {
        return Err(TarError::missing_end_marker(target));
    }

    let body_len = len - END_MARKER_LEN as u64;
    file.set_len(body_len)?;
    file.seek(SeekFrom::Start(body_len))?;
    log::info!(
        "appending {} files to {} at offset {}",
        files.len(),
        target.display(),
        body_len
    );

    let mut writer = ArchiveWriter::with_chunk_size(
        BufWriter::with_capacity(options.chunk_size, file),
        options.chunk_size,
    );
    for source in &files {
        let line = writer.write_entry(source)?;
        on_entry(&line);
    }

    let summary = *writer.summary();
    let file = writer
        .into_inner()?
        .into_inner()
        .map_err(|e| e.into_error())?;
    file.sync_all()?;

    log::info!("{}: appended {}", target.display(), summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create::create_archive;
    use crate::list::{ListOptions, list_archive};
    use blocktar_core::block::BLOCK_SIZE;
    use std::fs;

    #[test]
    fn test_append_extends_archive() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, b"one").unwrap();
        fs::write(&second, vec![b'2'; 1024]).unwrap();
        let target = dir.path().join("a.tar");

        create_archive(&target, &[&first], &CreateOptions::default(), |_| {}).unwrap();
        let before = fs::metadata(&target).unwrap().len();

        let summary = append_archive(&target, &[&second], &CreateOptions::default(), |_| {}).unwrap();
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.total_size, 1024);

        let after = fs::metadata(&target).unwrap().len();
        assert_eq!(after, before + (BLOCK_SIZE as u64) * 3);

        let mut names = Vec::new();
        let listed = list_archive(&target, &ListOptions::default(), |line| {
            names.push(line.header.name.clone())
        })
        .unwrap();
        assert_eq!(listed.entries, 2);
        assert_eq!(names, vec!["first.txt", "second.txt"]);
    }

    #[test]
    fn test_append_requires_end_marker() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.txt");
        fs::write(&source, b"s").unwrap();
        let target = dir.path().join("broken.tar");
        let mut bytes = vec![0u8; 3 * BLOCK_SIZE];
        bytes[2 * BLOCK_SIZE + 7] = 1;
        fs::write(&target, &bytes).unwrap();

        let err = append_archive(&target, &[&source], &CreateOptions::default(), |_| {}).unwrap_err();
        assert!(matches!(err, TarError::MissingEndMarker { .. }));
        assert_eq!(fs::read(&target).unwrap(), bytes);
    }

    #[test]
    fn test_append_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.txt");
        fs::write(&source, b"s").unwrap();

        let err = append_archive(&dir.path().join("none.tar"), &[&source], &CreateOptions::default(), |_| {})
            .unwrap_err();
        assert!(matches!(err, TarError::ArchiveNotFound { .. }));
    }
}
