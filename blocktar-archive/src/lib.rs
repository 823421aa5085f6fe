//! # blocktar Archive
//!
//! USTAR archive support for blocktar.
//!
//! This crate provides the header codec, the block stream state machine and
//! the four archive operations built on them:
//!
//! - **list**: Print every entry with its metadata
//! - **extract**: Restore entries below a destination directory
//! - **create**: Write a new archive from files and directories
//! - **append**: Add entries to the end of an existing archive
//!
//! Archives are processed in fixed-size chunks, so memory use does not
//! depend on archive or entry size.
//!
//! ## Example
//!
//! ```rust,no_run
//! use blocktar_archive::list::{ListOptions, list_archive};
//! use std::path::Path;
//!
//! let summary = list_archive(Path::new("backup.tar"), &ListOptions::default(), |line| {
//!     println!("{}", line);
//! })
//! .unwrap();
//! println!("{}", summary);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod append;
pub mod create;
pub mod extract;
pub mod filter;
pub mod header;
pub mod list;
pub mod report;
pub mod stream;
pub mod validate;
pub mod walk;
pub mod writer;

// Re-exports
pub use append::append_archive;
pub use create::{CreateOptions, create_archive};
pub use extract::{ExtractOptions, ExtractSummary, Outcome, extract_archive};
pub use filter::EntryFilter;
pub use header::{FileMetadata, HeaderRecord, decode, encode};
pub use list::{ListOptions, list_archive};
pub use report::{ArchiveSummary, EntryLine};
pub use stream::{BlockState, BlockStream};
pub use walk::SourceFile;
pub use writer::ArchiveWriter;
