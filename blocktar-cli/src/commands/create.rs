//! Create command implementation.

use crate::utils::create_spinner;
use blocktar_archive::{CreateOptions, create_archive};
use std::path::{Path, PathBuf};

pub fn cmd_create(
    archive: &Path,
    sources: &[PathBuf],
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_spinner(progress);

    let summary = create_archive(archive, sources, &CreateOptions::default(), |line| {
        if progress {
            pb.inc(1);
            pb.set_message(line.header.name.clone());
        } else {
            println!("{}", line);
        }
    })?;
    pb.finish_and_clear();

    println!();
    println!("Created {}: {}", archive.display(), summary);

    Ok(())
}
