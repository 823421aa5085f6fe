//! Pre-flight checks run before any streaming starts.

use blocktar_core::block::{BLOCK_SIZE, END_MARKER_LEN, MIN_ARCHIVE_LEN, is_zero_block};
use blocktar_core::error::{Result, TarError};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Check that `path` exists and has a plausible archive length.
///
/// Returns the archive length in bytes.
pub fn validate_archive(path: &Path) -> Result<u64> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TarError::archive_not_found(path),
        _ => TarError::Io(e),
    })?;
    let len = meta.len();

    if len % BLOCK_SIZE as u64 != 0 {
        return Err(TarError::not_block_aligned(len));
    }
    if len < MIN_ARCHIVE_LEN {
        return Err(TarError::archive_too_small(len));
    }

    log::debug!("{}: {} bytes, {} blocks", path.display(), len, len / BLOCK_SIZE as u64);
    Ok(len)
}

/// Check whether the last 1024 bytes of `file` are zero.
///
/// Leaves the file position at the end of the file.
pub fn has_end_marker(file: &mut File, len: u64) -> Result<bool> {
    if len < END_MARKER_LEN as u64 {
        return Ok(false);
    }
    let mut marker = [0u8; END_MARKER_LEN];
    file.seek(SeekFrom::Start(len - END_MARKER_LEN as u64))?;
    file.read_exact(&mut marker)?;
    Ok(is_zero_block(&marker))
}

/// Reject archive paths that do not carry a `.tar` extension.
pub fn require_tar_extension(path: &Path) -> Result<()> {
    let is_tar = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tar"));
    if is_tar {
        Ok(())
    } else {
        Err(TarError::invalid_archive_name(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_archive(&dir.path().join("none.tar")).unwrap_err();
        assert!(matches!(err, TarError::ArchiveNotFound { .. }));
    }

    #[test]
    fn test_unaligned_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "odd.tar", &[0u8; 2000]);
        let err = validate_archive(&path).unwrap_err();
        assert!(matches!(err, TarError::NotBlockAligned { len: 2000 }));
    }

    #[test]
    fn test_small_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "small.tar", &[0u8; 1024]);
        let err = validate_archive(&path).unwrap_err();
        assert!(matches!(err, TarError::ArchiveTooSmall { len: 1024 }));
    }

    #[test]
    fn test_end_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "ok.tar", &[0u8; 1536]);
        assert_eq!(validate_archive(&path).unwrap(), 1536);
        let mut file = File::open(&path).unwrap();
        assert!(has_end_marker(&mut file, 1536).unwrap());

        let mut data = vec![0u8; 1536];
        data[1535] = 1;
        let path = write_file(dir.path(), "bad.tar", &data);
        let mut file = File::open(&path).unwrap();
        assert!(!has_end_marker(&mut file, 1536).unwrap());
    }

    #[test]
    fn test_tar_extension() {
        assert!(require_tar_extension(Path::new("out/a.tar")).is_ok());
        assert!(require_tar_extension(Path::new("A.TAR")).is_ok());
        assert!(require_tar_extension(Path::new("a.tar.gz")).is_err());
        assert!(require_tar_extension(Path::new("archive")).is_err());
    }
}
