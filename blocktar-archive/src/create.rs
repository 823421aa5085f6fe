//! Writing a new archive from files on disk.

use crate::report::{ArchiveSummary, EntryLine};
use crate::validate::require_tar_extension;
use crate::walk::{SourceFile, walk_sources};
use crate::writer::ArchiveWriter;
use blocktar_core::block::DEFAULT_CHUNK_SIZE;
use blocktar_core::error::{Result, TarError};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Options for create and append.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Buffer size for reading sources and writing the archive.
    pub chunk_size: usize,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Create `target` from `sources`, replacing any existing file.
///
/// Every source is checked before the archive is touched. Directories are
/// expanded recursively; see [`walk_sources`] for naming.
pub fn create_archive<P, F>(
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
    let files = collect_sources(target, sources)?;

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    log::info!("creating {} from {} files", target.display(), files.len());
    let file = File::create(target)?;
    let mut writer =
        ArchiveWriter::with_chunk_size(BufWriter::with_capacity(options.chunk_size, file), options.chunk_size);

    for source in &files {
        let line = writer.write_entry(source)?;
        on_entry(&line);
    }

    let summary = *writer.summary();
    writer
        .into_inner()?
        .into_inner()
        .map_err(|e| e.into_error())?;

    log::info!("{}: {}", target.display(), summary);
    Ok(summary)
}

/// Expand `sources`, leaving out the archive itself.
pub(crate) fn collect_sources<P: AsRef<Path>>(target: &Path, sources: &[P]) -> Result<Vec<SourceFile>> {
    let own = fs::canonicalize(target).ok();
    let mut files = walk_sources(sources)?;

    if let Some(own) = own {
        files.retain(|f| {
            let is_self = fs::canonicalize(&f.path).is_ok_and(|p| p == own);
            if is_self {
                log::warn!("{}: skipping the archive itself", f.path.display());
            }
            !is_self
        });
    }

    if files.is_empty() {
        return Err(TarError::NoSources);
    }
    Ok(files)
}
