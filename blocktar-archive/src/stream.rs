//! Header/data state machine over a block sequence.
//!
//! [`BlockDecoder`] is the pure state machine: it is fed one 512-byte block at
//! a time and says what that block was. [`BlockStream`] drives it from a
//! [`BlockReader`], which already reslices arbitrary read chunks into blocks.

use crate::header::{HeaderRecord, decode};
use blocktar_core::block::{BLOCK_SIZE, BlockReader, DEFAULT_CHUNK_SIZE, is_zero_block};
use blocktar_core::error::{Result, TarError};
use std::io::{Read, Write};

/// Where the decoder is within the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// The next block is a header.
    AwaitingHeader,
    /// The next `blocks` blocks are payload, holding `bytes` meaningful bytes.
    AwaitingData {
        /// Payload blocks still to come.
        blocks: u64,
        /// Payload bytes still to come; the rest of the last block is padding.
        bytes: u64,
    },
}

/// What a single block turned out to be.
#[derive(Debug)]
pub enum Step<'a> {
    /// Zero block where a header was expected.
    Skipped,
    /// A header. `complete` is true when the entry has no payload blocks.
    Header {
        /// The decoded header.
        header: HeaderRecord,
        /// No payload follows.
        complete: bool,
    },
    /// Payload bytes with block padding already removed.
    Data {
        /// Meaningful bytes of this block.
        payload: &'a [u8],
        /// This was the entry's final block.
        last: bool,
    },
}

/// Block-at-a-time decoder.
#[derive(Debug, Clone)]
pub struct BlockDecoder {
    state: BlockState,
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDecoder {
    /// Create a decoder expecting a header.
    pub fn new() -> Self {
        Self {
            state: BlockState::AwaitingHeader,
        }
    }

    /// Current state.
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Consume one block.
    pub fn feed<'a>(&mut self, block: &'a [u8; BLOCK_SIZE]) -> Step<'a> {
        match self.state {
            BlockState::AwaitingHeader => {
                if is_zero_block(block) {
                    return Step::Skipped;
                }
                let header = decode(block);
                let blocks = header.data_blocks();
                if blocks > 0 {
                    self.state = BlockState::AwaitingData {
                        blocks,
                        bytes: header.size,
                    };
                }
                log::debug!(
                    "header '{}' ({}, {} bytes, {} data blocks)",
                    header.name,
                    header.typeflag,
                    header.size,
                    blocks
                );
                Step::Header {
                    header,
                    complete: blocks == 0,
                }
            }
            BlockState::AwaitingData { blocks, bytes } => {
                let take = bytes.min(BLOCK_SIZE as u64) as usize;
                let last = blocks == 1;
                self.state = if last {
                    BlockState::AwaitingHeader
                } else {
                    BlockState::AwaitingData {
                        blocks: blocks - 1,
                        bytes: bytes - take as u64,
                    }
                };
                Step::Data {
                    payload: &block[..take],
                    last,
                }
            }
        }
    }
}

/// Entry-level reader over an archive body.
///
/// The caller alternates [`next_header`](Self::next_header) with either
/// [`copy_payload`](Self::copy_payload) or [`skip_payload`](Self::skip_payload).
/// Asking for the next header mid-entry drains the rest of the payload first.
pub struct BlockStream<R: Read> {
    blocks: BlockReader<R>,
    decoder: BlockDecoder,
    current: Option<String>,
}

impl<R: Read> BlockStream<R> {
    /// Create a stream reading in [`DEFAULT_CHUNK_SIZE`] chunks.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a stream with a custom read chunk size.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            blocks: BlockReader::with_chunk_size(reader, chunk_size),
            decoder: BlockDecoder::new(),
            current: None,
        }
    }

    /// Current decoder state.
    pub fn state(&self) -> BlockState {
        self.decoder.state()
    }

    /// Byte offset of the next unread block.
    pub fn position(&self) -> u64 {
        self.blocks.position()
    }

    /// Advance to the next header, or `None` at end of input.
    pub fn next_header(&mut self) -> Result<Option<HeaderRecord>> {
        self.skip_payload()?;
        loop {
            let Some(block) = self.blocks.next_block()? else {
                return Ok(None);
            };
            match self.decoder.feed(block) {
                Step::Skipped => continue,
                Step::Header { header, complete } => {
                    self.current = (!complete).then(|| header.name.clone());
                    return Ok(Some(header));
                }
                Step::Data { .. } => unreachable!("decoder was drained before reading a header"),
            }
        }
    }

    /// Write the current entry's payload (padding excluded) to `out`.
    ///
    /// Returns the number of bytes written. Returns 0 when the entry has no payload
    /// or it was already consumed.
    pub fn copy_payload<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64> {
        let mut written = 0u64;
        while let BlockState::AwaitingData { blocks, .. } = self.decoder.state() {
            let Some(block) = self.blocks.next_block()? else {
                let name = self.current.take().unwrap_or_default();
                return Err(TarError::truncated_entry(name, blocks));
            };
            if let Step::Data { payload, last } = self.decoder.feed(block) {
                out.write_all(payload)?;
                written += payload.len() as u64;
                if last {
                    self.current = None;
                }
            }
        }
        Ok(written)
    }

    /// Discard the current entry's payload.
    pub fn skip_payload(&mut self) -> Result<u64> {
        self.copy_payload(&mut std::io::sink())
    }
}
