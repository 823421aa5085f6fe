//! USTAR header codec.
//!
//! Pure conversions between file metadata and the fixed 512-byte header
//! block. Nothing here performs archive I/O; [`FileMetadata::from_path`] only
//! stats the source file.
//!
//! | Offset | Length | Field |
//! |---|---|---|
//! | 0 | 100 | name |
//! | 100 | 8 | mode |
//! | 108 | 8 | uid |
//! | 116 | 8 | gid |
//! | 124 | 12 | size |
//! | 136 | 12 | mtime |
//! | 148 | 8 | checksum |
//! | 156 | 1 | typeflag |
//! | 157 | 100 | linkname |
//! | 257 | 6 | magic |
//! | 263 | 2 | version |
//! | 265 | 32 | uname |
//! | 297 | 32 | gname |
//! | 329 | 8 | devmajor |
//! | 337 | 8 | devminor |
//! | 345 | 155 | prefix |

use blocktar_core::block::{BLOCK_SIZE, blocks_for};
use blocktar_core::entry::{Mode, TypeFlag};
use blocktar_core::error::{Result, TarError};
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Maximum length of the name and linkname fields.
pub const NAME_LEN: usize = 100;

/// Largest payload the 11-digit octal size field can describe.
pub const MAX_ENTRY_SIZE: u64 = 0o77777777777;

const NAME: Range<usize> = 0..100;
const MODE: Range<usize> = 100..108;
const UID: Range<usize> = 108..116;
const GID: Range<usize> = 116..124;
const SIZE: Range<usize> = 124..136;
const MTIME: Range<usize> = 136..148;
const CHECKSUM: Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const LINKNAME: Range<usize> = 157..257;
const MAGIC: Range<usize> = 257..263;
const VERSION: Range<usize> = 263..265;
const UNAME: Range<usize> = 265..297;
const GNAME: Range<usize> = 297..329;
const DEVMAJOR: Range<usize> = 329..337;
const DEVMINOR: Range<usize> = 337..345;
const PREFIX: Range<usize> = 345..500;

const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";
/// Pre-POSIX GNU tar writes magic and version as one 8-byte string.
const GNU_MAGIC: &[u8; 8] = b"ustar  \0";

/// Metadata of a file about to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Name stored in the archive.
    pub name: String,
    /// Permission and special bits.
    pub mode: Mode,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// Payload size in bytes.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Entry kind.
    pub typeflag: TypeFlag,
    /// Link target, for symlinks.
    pub linkname: String,
}

impl FileMetadata {
    /// Metadata for an in-memory regular file.
    pub fn regular(name: impl Into<String>, size: u64, mode: u32, mtime: u64) -> Self {
        Self {
            name: name.into(),
            mode: Mode::from_bits(mode),
            uid: 0,
            gid: 0,
            size,
            mtime,
            typeflag: TypeFlag::File,
            linkname: String::new(),
        }
    }

    /// Stat `path` (without following symlinks) and describe it under `name`.
    pub fn from_path(path: &Path, name: impl Into<String>) -> Result<Self> {
        let meta = fs::symlink_metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TarError::source_not_found(path),
            _ => TarError::Io(e),
        })?;

        let typeflag = classify(&meta);
        let linkname = if typeflag.is_symlink() {
            fs::read_link(path)?.to_string_lossy().into_owned()
        } else {
            String::new()
        };
        let size = if typeflag.carries_payload() {
            meta.len()
        } else {
            0
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let (mode, uid, gid) = ownership(&meta);

        Ok(Self {
            name: name.into(),
            mode,
            uid,
            gid,
            size,
            mtime,
            typeflag,
            linkname,
        })
    }
}

/// Map a `lstat` result to a typeflag.
pub fn classify(meta: &fs::Metadata) -> TypeFlag {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return TypeFlag::SymLink;
    }
    if file_type.is_dir() {
        return TypeFlag::Directory;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::{FileTypeExt, MetadataExt};
        if file_type.is_fifo() {
            return TypeFlag::Fifo;
        }
        if file_type.is_block_device() {
            return TypeFlag::BlockDevice;
        }
        if file_type.is_char_device() {
            return TypeFlag::CharDevice;
        }
        if file_type.is_file() && meta.nlink() > 1 {
            return TypeFlag::HardLink;
        }
    }
    TypeFlag::File
}

#[cfg(unix)]
fn ownership(meta: &fs::Metadata) -> (Mode, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (Mode::from_bits(meta.mode()), meta.uid(), meta.gid())
}

#[cfg(not(unix))]
fn ownership(meta: &fs::Metadata) -> (Mode, u32, u32) {
    let mode = if meta.is_dir() {
        0o755
    } else if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    };
    (Mode::from_bits(mode), 0, 0)
}

/// A header block ready to be written.
#[derive(Debug, Clone)]
pub struct EncodedHeader {
    /// The 512 header bytes.
    pub block: [u8; BLOCK_SIZE],
    /// The name did not fit and was cut to [`NAME_LEN`] bytes.
    pub truncated: bool,
}

/// Encode metadata as a USTAR header block.
///
/// Owner/group names, device numbers and the prefix are always left blank.
///
/// # Errors
///
/// `EntryTooLarge` when the size does not fit the 12-byte size field.
pub fn encode(meta: &FileMetadata) -> Result<EncodedHeader> {
    if meta.size > MAX_ENTRY_SIZE {
        return Err(TarError::entry_too_large(&meta.name, meta.size));
    }

    let mut block = [0u8; BLOCK_SIZE];

    let truncated = write_string(&mut block[NAME], &meta.name);
    if truncated {
        log::warn!(
            "name '{}' is longer than {} bytes and was truncated",
            meta.name,
            NAME_LEN
        );
    }

    write_octal(&mut block[MODE], u64::from(meta.mode.bits()));
    if !write_octal(&mut block[UID], u64::from(meta.uid)) {
        log::warn!("uid {} of '{}' does not fit, stored as 0", meta.uid, meta.name);
    }
    if !write_octal(&mut block[GID], u64::from(meta.gid)) {
        log::warn!("gid {} of '{}' does not fit, stored as 0", meta.gid, meta.name);
    }
    write_octal(&mut block[SIZE], meta.size);
    if !write_octal(&mut block[MTIME], meta.mtime) {
        write_octal(&mut block[MTIME], MAX_ENTRY_SIZE);
    }

    block[TYPEFLAG] = meta.typeflag.as_byte();

    if write_string(&mut block[LINKNAME], &meta.linkname) {
        log::warn!("link target of '{}' was truncated", meta.name);
    }

    block[MAGIC].copy_from_slice(USTAR_MAGIC);
    block[VERSION].copy_from_slice(USTAR_VERSION);

    block[CHECKSUM].copy_from_slice(b"        ");
    let sum = checksum(&block);
    let field = format!("{:06o}\0 ", sum);
    block[CHECKSUM].copy_from_slice(field.as_bytes());

    Ok(EncodedHeader { block, truncated })
}

/// Sum of all header bytes with the checksum field counted as eight spaces.
pub fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    let all: u32 = block.iter().map(|&b| u32::from(b)).sum();
    let field: u32 = block[CHECKSUM].iter().map(|&b| u32::from(b)).sum();
    all - field + 8 * u32::from(b' ')
}

/// USTAR extension fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UstarFields {
    /// Owner name.
    pub uname: String,
    /// Group name.
    pub gname: String,
    /// Device major number.
    pub devmajor: u32,
    /// Device minor number.
    pub devminor: u32,
    /// Path prefix.
    pub prefix: String,
}

/// A decoded header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Entry name, joined with the USTAR prefix when one is present.
    pub name: String,
    /// Permission and special bits.
    pub mode: Mode,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// Payload size in bytes.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Checksum as stored in the block.
    pub checksum: u32,
    /// Entry kind.
    pub typeflag: TypeFlag,
    /// Link target.
    pub linkname: String,
    /// USTAR extension, present only when the magic matched.
    pub ustar: Option<UstarFields>,
    /// Stored checksum is unreadable or differs from the computed one.
    pub damaged: bool,
    /// The name field is full with no terminator, so the name was probably cut.
    pub truncated: bool,
}

impl HeaderRecord {
    /// Number of payload blocks following this header.
    pub fn data_blocks(&self) -> u64 {
        blocks_for(self.size)
    }

    /// Check if this is a directory entry.
    pub fn is_dir(&self) -> bool {
        self.typeflag.is_dir()
    }

    /// Permission string for listings.
    pub fn permission_string(&self) -> String {
        self.mode.permission_string(self.typeflag)
    }

    /// Name as shown in listings: `name -> target` for symlinks.
    pub fn display_name(&self) -> String {
        if self.typeflag.is_symlink() {
            format!("{} -> {}", self.name, self.linkname)
        } else {
            self.name.clone()
        }
    }
}

/// Decode a header block.
///
/// Never fails: unreadable numeric fields decode as zero, and a checksum
/// mismatch only sets `damaged`.
pub fn decode(block: &[u8; BLOCK_SIZE]) -> HeaderRecord {
    let raw_name = parse_string(&block[NAME]);
    let name_full = !block[NAME].contains(&0);

    let stored = parse_octal(&block[CHECKSUM]);
    let computed = checksum(block);
    let damaged = stored != Some(u64::from(computed));

    let ustar = if is_ustar(block) {
        Some(UstarFields {
            uname: parse_string(&block[UNAME]),
            gname: parse_string(&block[GNAME]),
            devmajor: octal_field(&block[DEVMAJOR]) as u32,
            devminor: octal_field(&block[DEVMINOR]) as u32,
            prefix: parse_string(&block[PREFIX]),
        })
    } else {
        None
    };

    let prefix = ustar.as_ref().map(|u| u.prefix.as_str()).unwrap_or("");
    let truncated = name_full && prefix.is_empty();
    let name = if prefix.is_empty() {
        raw_name
    } else {
        format!("{}/{}", prefix, raw_name)
    };

    HeaderRecord {
        name,
        mode: Mode::from_bits(octal_field(&block[MODE]) as u32),
        uid: octal_field(&block[UID]) as u32,
        gid: octal_field(&block[GID]) as u32,
        size: octal_field(&block[SIZE]),
        mtime: octal_field(&block[MTIME]),
        checksum: stored.unwrap_or(0) as u32,
        typeflag: TypeFlag::from_byte(block[TYPEFLAG]),
        linkname: parse_string(&block[LINKNAME]),
        ustar,
        damaged,
        truncated,
    }
}

fn is_ustar(block: &[u8; BLOCK_SIZE]) -> bool {
    (&block[MAGIC] == USTAR_MAGIC && &block[VERSION] == USTAR_VERSION)
        || &block[MAGIC.start..VERSION.end] == GNU_MAGIC
}

/// Parse a NUL-padded string field.
fn parse_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Parse an octal field, tolerating surrounding spaces and NULs.
fn parse_octal(data: &[u8]) -> Option<u64> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let s = std::str::from_utf8(&data[..end]).ok()?.trim();
    if s.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(s, 8).ok()
}

fn octal_field(data: &[u8]) -> u64 {
    parse_octal(data).unwrap_or_else(|| {
        log::debug!("unreadable octal field {:?}", String::from_utf8_lossy(data));
        0
    })
}

/// Copy a string into a NUL-padded field. Returns true if it had to be cut.
///
/// A cut never splits a UTF-8 sequence.
fn write_string(field: &mut [u8], s: &str) -> bool {
    let mut len = s.len().min(field.len());
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    field[..len].copy_from_slice(&s.as_bytes()[..len]);
    s.len() > field.len()
}

/// Write a zero-padded octal number followed by a NUL. Returns false if it does not fit.
fn write_octal(field: &mut [u8], value: u64) -> bool {
    let digits = field.len() - 1;
    let s = format!("{:0width$o}", value, width = digits);
    if s.len() > digits {
        return false;
    }
    field[..digits].copy_from_slice(s.as_bytes());
    field[digits] = 0;
    true
}
