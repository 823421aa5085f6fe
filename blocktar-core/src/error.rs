//! Error types for blocktar operations.
//!
//! Only conditions that stop an operation live here. Per-entry anomalies
//! (checksum mismatch, truncated names, extraction collisions) are counted
//! in the operation summaries instead of being raised.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for blocktar operations.
#[derive(Debug, Error)]
pub enum TarError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive to read or append to does not exist.
    #[error("Archive not found: {}", path.display())]
    ArchiveNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A source path given to create/append does not exist.
    #[error("Source not found: {}", path.display())]
    SourceNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Archive length is not a whole number of blocks.
    #[error("Archive size {len} is not a multiple of 512 bytes")]
    NotBlockAligned {
        /// Length of the archive in bytes.
        len: u64,
    },

    /// Archive is shorter than the smallest well-formed archive.
    #[error("Archive size {len} is below the 1536 byte minimum")]
    ArchiveTooSmall {
        /// Length of the archive in bytes.
        len: u64,
    },

    /// The trailing 1024 bytes of the archive are not all zero.
    #[error("Archive {} does not end with an end-of-archive marker", path.display())]
    MissingEndMarker {
        /// Path of the archive.
        path: PathBuf,
    },

    /// Unexpected end of stream while a block was partially read.
    #[error("Unexpected end of file: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Stream ended before an entry's payload was complete.
    #[error("Entry '{name}' is truncated: {missing} data blocks missing")]
    TruncatedEntry {
        /// Name of the entry.
        name: String,
        /// Number of payload blocks that never arrived.
        missing: u64,
    },

    /// Source file is too large for the 12-byte octal size field.
    #[error("Entry '{name}' is too large for a USTAR header: {size} bytes")]
    EntryTooLarge {
        /// Name of the entry.
        name: String,
        /// Size of the source file.
        size: u64,
    },

    /// Entry name would escape the extraction root.
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious path.
        path: String,
    },

    /// Nothing to write after expanding all sources.
    #[error("No files to archive")]
    NoSources,

    /// Archive path is not acceptable for the requested operation.
    #[error("Archive path must end in .tar: {}", path.display())]
    InvalidArchiveName {
        /// The rejected path.
        path: PathBuf,
    },
}

/// Result type alias for blocktar operations.
pub type Result<T> = std::result::Result<T, TarError>;

impl TarError {
    /// Create an archive-not-found error.
    pub fn archive_not_found(path: impl AsRef<Path>) -> Self {
        Self::ArchiveNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a source-not-found error.
    pub fn source_not_found(path: impl AsRef<Path>) -> Self {
        Self::SourceNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a block alignment error.
    pub fn not_block_aligned(len: u64) -> Self {
        Self::NotBlockAligned { len }
    }

    /// Create an archive-too-small error.
    pub fn archive_too_small(len: u64) -> Self {
        Self::ArchiveTooSmall { len }
    }

    /// Create a missing end marker error.
    pub fn missing_end_marker(path: impl AsRef<Path>) -> Self {
        Self::MissingEndMarker {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a truncated entry error.
    pub fn truncated_entry(name: impl Into<String>, missing: u64) -> Self {
        Self::TruncatedEntry {
            name: name.into(),
            missing,
        }
    }

    /// Create an entry-too-large error.
    pub fn entry_too_large(name: impl Into<String>, size: u64) -> Self {
        Self::EntryTooLarge {
            name: name.into(),
            size,
        }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Create an invalid archive name error.
    pub fn invalid_archive_name(path: impl AsRef<Path>) -> Self {
        Self::InvalidArchiveName {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// True for errors raised by pre-flight validation, before any streaming.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound { .. }
                | Self::SourceNotFound { .. }
                | Self::NotBlockAligned { .. }
                | Self::ArchiveTooSmall { .. }
                | Self::MissingEndMarker { .. }
                | Self::NoSources
                | Self::InvalidArchiveName { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TarError::not_block_aligned(1000);
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("512"));

        let err = TarError::archive_too_small(1024);
        assert!(err.to_string().contains("1536"));

        let err = TarError::truncated_entry("data.bin", 3);
        assert!(err.to_string().contains("data.bin"));

        let err = TarError::source_not_found("/nope/file.txt");
        assert!(err.to_string().contains("/nope/file.txt"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: TarError = io_err.into();
        assert!(matches!(err, TarError::Io(_)));
        assert!(!err.is_preflight());
    }

    #[test]
    fn test_preflight_classification() {
        assert!(TarError::archive_too_small(512).is_preflight());
        assert!(TarError::NoSources.is_preflight());
        assert!(!TarError::unexpected_eof(12).is_preflight());
        assert!(!TarError::path_traversal("../x").is_preflight());
    }
}
