//! Archive entry kind and permission model.
//!
//! This module defines the typeflag discriminator stored at header offset 156,
//! the 12-bit mode field, and the `ls -l` style rendering shared by every
//! operation that reports entries.

use crate::error::{Result, TarError};
use std::path::{Component, Path, PathBuf};

/// Entry kind, decoded from the one-byte typeflag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeFlag {
    /// Regular file (`'0'`, or NUL in pre-POSIX archives).
    #[default]
    File,
    /// Hard link (`'1'`).
    HardLink,
    /// Symbolic link (`'2'`).
    SymLink,
    /// Character device (`'3'`).
    CharDevice,
    /// Block device (`'4'`).
    BlockDevice,
    /// Directory (`'5'`).
    Directory,
    /// Named pipe (`'6'`).
    Fifo,
    /// Contiguous file (`'7'`).
    Contiguous,
    /// Global extended header (`'g'`).
    GlobalExtHeader,
    /// Extended header for the next entry (`'x'`).
    NextExtHeader,
    /// Vendor specific extension (`'A'..='Z'`).
    VendorSpecific(u8),
    /// Any other byte.
    Reserved(u8),
}

impl TypeFlag {
    /// Decode a typeflag byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | 0 => Self::File,
            b'1' => Self::HardLink,
            b'2' => Self::SymLink,
            b'3' => Self::CharDevice,
            b'4' => Self::BlockDevice,
            b'5' => Self::Directory,
            b'6' => Self::Fifo,
            b'7' => Self::Contiguous,
            b'g' => Self::GlobalExtHeader,
            b'x' => Self::NextExtHeader,
            b'A'..=b'Z' => Self::VendorSpecific(byte),
            other => Self::Reserved(other),
        }
    }

    /// Encode as the typeflag byte written to disk.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::File => b'0',
            Self::HardLink => b'1',
            Self::SymLink => b'2',
            Self::CharDevice => b'3',
            Self::BlockDevice => b'4',
            Self::Directory => b'5',
            Self::Fifo => b'6',
            Self::Contiguous => b'7',
            Self::GlobalExtHeader => b'g',
            Self::NextExtHeader => b'x',
            Self::VendorSpecific(b) | Self::Reserved(b) => *b,
        }
    }

    /// Whether this kind of entry can carry payload bytes that extraction writes out.
    ///
    /// Hard links count: archives written by this crate store the full content
    /// of multiply-linked files.
    pub fn carries_payload(&self) -> bool {
        matches!(
            self,
            Self::File | Self::HardLink | Self::Contiguous | Self::Reserved(_)
        )
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::SymLink)
    }

    /// First character of the permission string.
    pub fn type_char(&self) -> char {
        match self {
            Self::Directory => 'd',
            Self::SymLink => 'l',
            Self::Fifo => 'p',
            Self::BlockDevice => 'b',
            Self::CharDevice => 'c',
            _ => '-',
        }
    }

    /// Short human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::HardLink => "hard link",
            Self::SymLink => "symlink",
            Self::CharDevice => "character device",
            Self::BlockDevice => "block device",
            Self::Directory => "directory",
            Self::Fifo => "fifo",
            Self::Contiguous => "contiguous file",
            Self::GlobalExtHeader => "global extended header",
            Self::NextExtHeader => "extended header",
            Self::VendorSpecific(_) => "vendor extension",
            Self::Reserved(_) => "reserved",
        }
    }
}

impl std::fmt::Display for TypeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The 12 permission and special bits of the mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mode(u16);

impl Mode {
    /// Mask of all bits carried by a USTAR mode.
    pub const MASK: u32 = 0o7777;

    const SETUID: u16 = 0o4000;
    const SETGID: u16 = 0o2000;
    const STICKY: u16 = 0o1000;

    /// Build from raw bits; anything above `0o7777` (file type bits) is dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self((bits & Self::MASK) as u16)
    }

    /// Raw bits.
    pub fn bits(&self) -> u32 {
        u32::from(self.0)
    }

    /// Only the `rwxrwxrwx` bits.
    pub fn permissions(&self) -> u32 {
        u32::from(self.0) & 0o777
    }

    /// Set-user-ID bit.
    pub fn setuid(&self) -> bool {
        self.0 & Self::SETUID != 0
    }

    /// Set-group-ID bit.
    pub fn setgid(&self) -> bool {
        self.0 & Self::SETGID != 0
    }

    /// Sticky bit.
    pub fn sticky(&self) -> bool {
        self.0 & Self::STICKY != 0
    }

    /// Owner read/write/execute.
    pub fn owner(&self) -> (bool, bool, bool) {
        self.triad(6)
    }

    /// Group read/write/execute.
    pub fn group(&self) -> (bool, bool, bool) {
        self.triad(3)
    }

    /// Other read/write/execute.
    pub fn other(&self) -> (bool, bool, bool) {
        self.triad(0)
    }

    fn triad(&self, shift: u16) -> (bool, bool, bool) {
        let bits = (self.0 >> shift) & 0o7;
        (bits & 0o4 != 0, bits & 0o2 != 0, bits & 0o1 != 0)
    }

    /// Render a 10-character `ls -l` style permission string.
    pub fn permission_string(&self, typeflag: TypeFlag) -> String {
        let mut out = String::with_capacity(10);
        out.push(typeflag.type_char());

        let columns = [
            (self.owner(), self.setuid(), 's'),
            (self.group(), self.setgid(), 's'),
            (self.other(), self.sticky(), 't'),
        ];
        for ((r, w, x), special, special_char) in columns {
            out.push(if r { 'r' } else { '-' });
            out.push(if w { 'w' } else { '-' });
            out.push(match (x, special) {
                (true, true) => special_char,
                (false, true) => special_char.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            });
        }
        out
    }
}

impl std::fmt::Octal for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Octal::fmt(&self.0, f)
    }
}

/// Turn an entry name into a path that stays below the extraction root.
///
/// Absolute names, `..` components, and embedded NULs are rejected.
/// `.` components and redundant separators are dropped.
pub fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return Err(TarError::path_traversal(name));
    }

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                if s.to_string_lossy().contains('\0') {
                    return Err(TarError::path_traversal(name));
                }
                out.push(s);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TarError::path_traversal(name));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(TarError::path_traversal(name));
    }
    Ok(out)
}
