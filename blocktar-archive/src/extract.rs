//! Streaming extraction to a destination directory.
//!
//! Entries whose destination already exists are skipped, never overwritten.
//! Names that would land outside the destination (absolute paths, `..`, or a
//! path through a symlink created by an earlier entry) are rejected.

use crate::filter::EntryFilter;
use crate::header::HeaderRecord;
use crate::report::EntryLine;
use crate::stream::BlockStream;
use crate::validate::{has_end_marker, validate_archive};
use blocktar_core::block::{DEFAULT_CHUNK_SIZE, END_MARKER_LEN};
use blocktar_core::entry::{TypeFlag, safe_relative_path};
use blocktar_core::error::Result;
use filetime::FileTime;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Options for extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Read chunk size, also used as the output buffer size.
    pub chunk_size: usize,
    /// Entries to extract; others are skipped silently and not counted.
    pub filter: EntryFilter,
    /// Restore modification times.
    pub preserve_mtime: bool,
    /// Restore `rwxrwxrwx` permission bits (never set-id or sticky).
    pub preserve_permissions: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            filter: EntryFilter::default(),
            preserve_mtime: true,
            preserve_permissions: true,
        }
    }
}

/// What happened to one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Written to disk.
    Extracted,
    /// Destination already existed.
    SkippedExisting,
    /// Name would escape the destination root.
    Rejected,
    /// Entry kind is not restored (devices, FIFOs, extension headers).
    Unsupported,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extracted => "extracted",
            Self::SkippedExisting => "exists, skipped",
            Self::Rejected => "unsafe path, rejected",
            Self::Unsupported => "unsupported type, skipped",
        })
    }
}

/// Counters for extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Entries selected by the filter.
    pub entries: u64,
    /// Entries written to disk.
    pub extracted: u64,
    /// Bytes written to disk.
    pub extracted_size: u64,
    /// Entries skipped because the destination existed.
    pub skipped_existing: u64,
    /// Entries rejected for unsafe names.
    pub rejected: u64,
    /// Entries of a kind that is not restored.
    pub unsupported: u64,
    /// Entries whose checksum did not verify.
    pub damaged: u64,
    /// Sum of damaged entry sizes.
    pub damaged_size: u64,
    /// Entries with a truncated name.
    pub truncated: u64,
}

impl fmt::Display for ExtractSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} extracted ({} bytes), {} already existed, {} rejected, {} unsupported; \
             {} damaged ({} bytes); {} truncated names",
            self.entries,
            self.extracted,
            self.extracted_size,
            self.skipped_existing,
            self.rejected,
            self.unsupported,
            self.damaged,
            self.damaged_size,
            self.truncated
        )
    }
}

/// Extract the archive at `path` below `dest`.
///
/// `dest` is created if needed. `on_entry` is called after each selected entry
/// with what happened to it.
pub fn extract_archive<F>(
    path: &Path,
    dest: &Path,
    options: &ExtractOptions,
    on_entry: F,
) -> Result<ExtractSummary>
where
    F: FnMut(&EntryLine, Outcome),
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
    fs::create_dir_all(dest)?;

    log::info!("extracting {} to {}", path.display(), dest.display());
    let body = file.take(len - END_MARKER_LEN as u64);
    extract_stream(body, dest, options, on_entry)
}

/// Extract entries from an archive body that has already been validated.
pub fn extract_stream<R, F>(
    reader: R,
    dest: &Path,
    options: &ExtractOptions,
    mut on_entry: F,
) -> Result<ExtractSummary>
where
    R: Read,
    F: FnMut(&EntryLine, Outcome),
{
    let mut stream = BlockStream::with_chunk_size(reader, options.chunk_size);
    let mut summary = ExtractSummary::default();
    let mut index = 0u64;
    let mut dir_modes = Vec::new();

    while let Some(header) = stream.next_header()? {
        index += 1;
        if !options.filter.matches(&header.name) {
            continue;
        }

        summary.entries += 1;
        if header.damaged {
            log::warn!("entry {} '{}': checksum mismatch", index, header.name);
            summary.damaged += 1;
            summary.damaged_size += header.size;
        }
        if header.truncated {
            summary.truncated += 1;
        }

        let outcome = extract_entry(&mut stream, &header, dest, options, &mut dir_modes)?;
        match outcome {
            Outcome::Extracted => {
                summary.extracted += 1;
                summary.extracted_size += header.size;
            }
            Outcome::SkippedExisting => summary.skipped_existing += 1,
            Outcome::Rejected => summary.rejected += 1,
            Outcome::Unsupported => summary.unsupported += 1,
        }

        on_entry(&EntryLine { index, header }, outcome);
    }

    // reverse archive order puts children before their parents
    // so a read-only directory is locked only after its contents exist
    for (dir, mode) in dir_modes.iter().rev() {
        set_permissions(dir, *mode);
    }

    Ok(summary)
}

fn extract_entry<R: Read>(
    stream: &mut BlockStream<R>,
    header: &HeaderRecord,
    dest: &Path,
    options: &ExtractOptions,
    dir_modes: &mut Vec<(PathBuf, u32)>,
) -> Result<Outcome> {
    let rel = match safe_relative_path(&header.name) {
        Ok(rel) => rel,
        Err(e) => {
            log::warn!("{}", e);
            return Ok(Outcome::Rejected);
        }
    };
    if crosses_symlink(dest, &rel) {
        log::warn!("'{}' passes through a symlink, rejected", header.name);
        return Ok(Outcome::Rejected);
    }

    let target = dest.join(&rel);
    if target.symlink_metadata().is_ok() {
        log::info!("{}: already exists, skipped", target.display());
        return Ok(Outcome::SkippedExisting);
    }

    match header.typeflag {
        TypeFlag::Directory => {
            fs::create_dir_all(&target)?;
            if options.preserve_permissions {
                dir_modes.push((target, header.mode.permissions()));
            }
            Ok(Outcome::Extracted)
        }
        TypeFlag::HardLink if header.size == 0 && !header.linkname.is_empty() => {
            let Ok(source_rel) = safe_relative_path(&header.linkname) else {
                log::warn!("hard link target '{}' rejected", header.linkname);
                return Ok(Outcome::Rejected);
            };
            if crosses_symlink(dest, &source_rel) {
                log::warn!(
                    "hard link target '{}' passes through a symlink, rejected",
                    header.linkname
                );
                return Ok(Outcome::Rejected);
            }
            let source = dest.join(source_rel);
            match source.symlink_metadata() {
                Ok(meta) if meta.file_type().is_symlink() => {
                    log::warn!("hard link target '{}' is a symlink, rejected", header.linkname);
                    return Ok(Outcome::Rejected);
                }
                Ok(meta) if meta.is_file() => {}
                _ => {
                    log::warn!(
                        "'{}': link target '{}' was not extracted",
                        header.name,
                        header.linkname
                    );
                    return Ok(Outcome::Unsupported);
                }
            }
            create_parent(&target)?;
            fs::hard_link(source, &target)?;
            Ok(Outcome::Extracted)
        }
        flag if flag.carries_payload() => {
            create_parent(&target)?;
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)?;
            let mut out = BufWriter::with_capacity(options.chunk_size, file);
            stream.copy_payload(&mut out)?;
            out.flush()?;
            drop(out);

            if options.preserve_permissions {
                set_permissions(&target, header.mode.permissions());
            }
            if options.preserve_mtime {
                set_mtime(&target, header.mtime);
            }
            Ok(Outcome::Extracted)
        }
        TypeFlag::SymLink => extract_symlink(header, &target),
        other => {
            log::warn!("'{}': {} entries are not extracted", header.name, other);
            Ok(Outcome::Unsupported)
        }
    }
}

#[cfg(unix)]
fn extract_symlink(header: &HeaderRecord, target: &Path) -> Result<Outcome> {
    create_parent(target)?;
    std::os::unix::fs::symlink(&header.linkname, target)?;
    Ok(Outcome::Extracted)
}

#[cfg(not(unix))]
fn extract_symlink(header: &HeaderRecord, _target: &Path) -> Result<Outcome> {
    log::warn!("'{}': symlinks are not extracted on this platform", header.name);
    Ok(Outcome::Unsupported)
}

fn create_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// True if any existing ancestor of `rel` below `dest` is a symlink.
fn crosses_symlink(dest: &Path, rel: &Path) -> bool {
    let mut current = PathBuf::from(dest);
    let Some(parent) = rel.parent() else {
        return false;
    };
    for component in parent.components() {
        current.push(component);
        match current.symlink_metadata() {
            Ok(meta) if meta.file_type().is_symlink() => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        log::warn!("Failed to set permissions on '{}': {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) {}

fn set_mtime(path: &Path, mtime: u64) {
    let time = FileTime::from_unix_time(i64::try_from(mtime).unwrap_or(i64::MAX), 0);
    if let Err(e) = filetime::set_file_mtime(path, time) {
        log::warn!(
            "Failed to set modification time on '{}': {}",
            path.display(),
            e
        );
    }
}
