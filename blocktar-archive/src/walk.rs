//! Source expansion for create and append.
//!
//! Directories are expanded depth-first into the files they contain. Each
//! file gets an archive name relative to the parent of the source argument,
//! so `create out.tar photos` stores `photos/2024/a.jpg`.

use blocktar_core::error::{Result, TarError};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Name to store in the archive, `/` separated.
    pub name: String,
}

/// Expand one source argument.
///
/// Directory entries themselves are not emitted. Symlinks are not followed
/// (except when `root` itself is one) and sockets are skipped.
pub fn walk_paths(root: &Path) -> Result<Vec<SourceFile>> {
    if root.symlink_metadata().is_err() {
        return Err(TarError::source_not_found(root));
    }

    let label = root.file_name().map(PathBuf::from);
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if is_socket(&file_type) {
            log::warn!("{}: socket ignored", entry.path().display());
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let named = match (&label, rel.as_os_str().is_empty()) {
            (Some(label), true) => label.clone(),
            (Some(label), false) => label.join(rel),
            (None, _) => rel.to_path_buf(),
        };

        files.push(SourceFile {
            path: entry.path().to_path_buf(),
            name: archive_name(&named),
        });
    }

    Ok(files)
}

/// Check every source exists, then expand them in order.
pub fn walk_sources<P: AsRef<Path>>(sources: &[P]) -> Result<Vec<SourceFile>> {
    for source in sources {
        let source = source.as_ref();
        if source.symlink_metadata().is_err() {
            return Err(TarError::source_not_found(source));
        }
    }

    let mut files = Vec::new();
    for source in sources {
        files.extend(walk_paths(source.as_ref())?);
    }
    log::debug!("{} sources expanded to {} files", sources.len(), files.len());
    Ok(files)
}

/// Join the normal components of `path` with `/`.
fn archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn is_socket(file_type: &std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    file_type.is_socket()
}

#[cfg(not(unix))]
fn is_socket(_file_type: &std::fs::FileType) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_walk_directory_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("b/inner/deep.txt"), b"d").unwrap();
        fs::write(root.join("b/z.txt"), b"z").unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();

        let files = walk_paths(&root).unwrap();
        assert_eq!(
            names(&files),
            vec![
                "proj/a.txt",
                "proj/b/inner/deep.txt",
                "proj/b/z.txt",
                "proj/c.txt"
            ]
        );
        assert_eq!(files[0].path, root.join("a.txt"));
    }

    #[test]
    fn test_walk_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.md");
        fs::write(&file, b"hi").unwrap();

        let files = walk_paths(&file).unwrap();
        assert_eq!(names(&files), vec!["note.md"]);
    }

    #[test]
    fn test_walk_missing() {
        let err = walk_paths(Path::new("/no/such/source")).unwrap_err();
        assert!(matches!(err, TarError::SourceNotFound { .. }));
    }

    #[test]
    fn test_walk_sources_checks_all_first() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ok.txt");
        fs::write(&file, b"ok").unwrap();

        let err = walk_sources(&[file.clone(), dir.path().join("gone.txt")]).unwrap_err();
        assert!(matches!(err, TarError::SourceNotFound { .. }));

        let files = walk_sources(&[file.clone(), file]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_keeps_symlinks_unfollowed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("real")).unwrap();
        fs::write(root.join("real/file.txt"), b"x").unwrap();
        std::os::unix::fs::symlink("real", root.join("alias")).unwrap();

        let files = walk_paths(&root).unwrap();
        assert_eq!(names(&files), vec!["tree/alias", "tree/real/file.txt"]);
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(Path::new("./a/b/c.txt")), "a/b/c.txt");
        assert_eq!(archive_name(Path::new("/abs/x")), "abs/x");
    }
}
