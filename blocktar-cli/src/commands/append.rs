//! Append command implementation.

use crate::utils::create_spinner;
use blocktar_archive::{CreateOptions, append_archive};
use std::path::{Path, PathBuf};

pub fn cmd_append(
    archive: &Path,
    sources: &[PathBuf],
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_spinner(progress);

    let result = append_archive(archive, sources, &CreateOptions::default(), |line| {
        if progress {
            pb.inc(1);
            pb.set_message(line.header.name.clone());
        } else {
            println!("{}", line);
        }
    });
    pb.finish_and_clear();

    match result {
        Ok(summary) => {
            println!();
            println!("Appended to {}: {}", archive.display(), summary);
            Ok(())
        }
        Err(e) if !e.is_preflight() => {
            log::error!(
                "{} may be left without an end-of-archive marker",
                archive.display()
            );
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
