//! # blocktar Core
//!
//! Core components for the blocktar archive engine.
//!
//! This crate provides the fundamental building blocks shared by every
//! archive operation:
//!
//! - [`block`]: 512-byte block units and the chunked `BlockReader`
//! - [`entry`]: Entry kind (typeflag) and permission model
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! blocktar is layered like a small protocol stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: CLI                                                 │
//! │     list / extract / create / append commands           │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Archive                                             │
//! │     USTAR header codec, block stream, operations        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Blocks (this crate)                                 │
//! │     BlockReader, TypeFlag, Mode, TarError               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use blocktar_core::entry::{Mode, TypeFlag};
//!
//! let mode = Mode::from_bits(0o755);
//! assert_eq!(mode.permission_string(TypeFlag::Directory), "drwxr-xr-x");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod entry;
pub mod error;

// Re-exports for convenience
pub use block::{
    BLOCK_SIZE, BlockReader, DEFAULT_CHUNK_SIZE, END_MARKER_LEN, MIN_ARCHIVE_LEN, ZERO_BLOCK,
    blocks_for, is_zero_block, padding_for,
};
pub use entry::{Mode, TypeFlag, safe_relative_path};
pub use error::{Result, TarError};
