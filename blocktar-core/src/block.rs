//! Fixed-size block units.
//!
//! A TAR archive is a sequence of 512-byte blocks. This module provides the
//! block constants and `BlockReader`, which pulls the underlying stream in
//! large chunks and reslices them into whole blocks regardless of where the
//! chunk boundaries fall.
//!
//! # Example
//!
//! ```
//! use blocktar_core::block::{BlockReader, BLOCK_SIZE};
//! use std::io::Cursor;
//!
//! let data = vec![7u8; BLOCK_SIZE * 3];
//! let mut reader = BlockReader::with_chunk_size(Cursor::new(data), 700);
//!
//! let mut count = 0;
//! while let Some(block) = reader.next_block().unwrap() {
//!     assert!(block.iter().all(|&b| b == 7));
//!     count += 1;
//! }
//! assert_eq!(count, 3);
//! ```

use crate::error::{Result, TarError};
use std::io::{ErrorKind, Read};

/// TAR block size.
pub const BLOCK_SIZE: usize = 512;

/// Length of the end-of-archive marker (two zero blocks).
pub const END_MARKER_LEN: usize = 2 * BLOCK_SIZE;

/// Smallest well-formed archive: one header plus the end marker.
pub const MIN_ARCHIVE_LEN: u64 = 3 * BLOCK_SIZE as u64;

/// Default read chunk size (128 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// An all-zero block.
pub const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// Number of blocks needed to hold `size` payload bytes.
pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64)
}

/// Number of zero bytes that pad `size` payload bytes to a block boundary.
pub fn padding_for(size: u64) -> usize {
    let rem = (size % BLOCK_SIZE as u64) as usize;
    (BLOCK_SIZE - rem) % BLOCK_SIZE
}

/// Check whether a block consists only of zero bytes.
pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Chunked block reader.
///
/// Each refill issues one `read` into a buffer of `chunk_size` bytes. A
/// partial block left at the end of a chunk is carried over and completed by
/// the next one.
#[derive(Debug)]
pub struct BlockReader<R: Read> {
    /// Underlying reader.
    reader: R,
    /// Chunk buffer.
    buf: Vec<u8>,
    /// Start of unconsumed bytes in `buf`.
    start: usize,
    /// End of valid bytes in `buf`.
    end: usize,
    /// Blocks handed out so far.
    blocks_read: u64,
    /// Underlying reader reported EOF.
    eof: bool,
}

impl<R: Read> BlockReader<R> {
    /// Create a reader using [`DEFAULT_CHUNK_SIZE`].
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a reader with a custom chunk size. Values below one block are raised to one block.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size.max(BLOCK_SIZE)],
            start: 0,
            end: 0,
            blocks_read: 0,
            eof: false,
        }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consume this `BlockReader` and return the underlying reader.
    ///
    /// Bytes already buffered but not yet handed out are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Number of blocks returned so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Byte offset of the next block relative to where reading started.
    pub fn position(&self) -> u64 {
        self.blocks_read * BLOCK_SIZE as u64
    }

    /// Return the next block, or `None` at a clean end of stream.
    ///
    /// # Errors
    ///
    /// `UnexpectedEof` if the stream ends in the middle of a block.
    pub fn next_block(&mut self) -> Result<Option<&[u8; BLOCK_SIZE]>> {
        while self.end - self.start < BLOCK_SIZE {
            if self.eof {
                let buffered = self.end - self.start;
                if buffered == 0 {
                    return Ok(None);
                }
                return Err(TarError::unexpected_eof(BLOCK_SIZE - buffered));
            }
            self.refill()?;
        }

        let at = self.start;
        self.start += BLOCK_SIZE;
        self.blocks_read += 1;
        Ok(self.buf[at..].first_chunk::<BLOCK_SIZE>())
    }

    /// Pull one more chunk from the underlying reader.
    fn refill(&mut self) -> Result<()> {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        loop {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Reader that never returns more than `max` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        max: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.len().min(buf.len()).min(self.max);
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn numbered_blocks(count: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(count * BLOCK_SIZE);
        for i in 0..count {
            data.extend(std::iter::repeat_n(i as u8, BLOCK_SIZE));
        }
        data
    }

    #[test]
    fn test_block_math() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(512), 1);
        assert_eq!(blocks_for(513), 2);
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(10), 502);
        assert_eq!(padding_for(512), 0);
        assert_eq!(padding_for(1000), 24);
    }

    #[test]
    fn test_zero_block() {
        assert!(is_zero_block(&ZERO_BLOCK));
        let mut block = ZERO_BLOCK;
        block[511] = 1;
        assert!(!is_zero_block(&block));
    }

    #[test]
    fn test_reads_all_blocks() {
        let data = numbered_blocks(5);
        let mut reader = BlockReader::new(Cursor::new(data));
        for i in 0..5u8 {
            let block = reader.next_block().unwrap().unwrap();
            assert!(block.iter().all(|&b| b == i));
        }
        assert!(reader.next_block().unwrap().is_none());
        assert_eq!(reader.blocks_read(), 5);
        assert_eq!(reader.position(), 5 * BLOCK_SIZE as u64);
    }

    #[test]
    fn test_partial_trailing_block() {
        let mut data = numbered_blocks(2);
        data.extend_from_slice(&[9u8; 100]);
        let mut reader = BlockReader::with_chunk_size(Cursor::new(data), 300);
        assert!(reader.next_block().unwrap().is_some());
        assert!(reader.next_block().unwrap().is_some());
        match reader.next_block() {
            Err(TarError::UnexpectedEof { expected }) => assert_eq!(expected, 412),
            other => panic!("expected UnexpectedEof, got {:?}", other.map(|b| b.is_some())),
        }
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = BlockReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_block().unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_blocks(
            count in 0usize..12,
            chunk in 1usize..3000,
            trickle in 1usize..2000,
        ) {
            let data = numbered_blocks(count);
            let mut reader = BlockReader::with_chunk_size(
                Trickle { data: &data, max: trickle },
                chunk,
            );
            let mut seen = Vec::new();
            while let Some(block) = reader.next_block().unwrap() {
                seen.extend_from_slice(block);
            }
            prop_assert_eq!(seen, data);
        }
    }
}
