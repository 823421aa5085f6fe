//! Sequential archive writer shared by create and append.

use crate::header::{FileMetadata, decode, encode};
use crate::report::{ArchiveSummary, EntryLine};
use crate::walk::SourceFile;
use blocktar_core::block::{DEFAULT_CHUNK_SIZE, END_MARKER_LEN, ZERO_BLOCK, padding_for};
use blocktar_core::error::Result;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};

/// Writes entries one after another, then the end-of-archive marker.
pub struct ArchiveWriter<W: Write> {
    writer: W,
    chunk_size: usize,
    summary: ArchiveSummary,
    finished: bool,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a new writer positioned where the next header goes.
    pub fn new(writer: W) -> Self {
        Self::with_chunk_size(writer, DEFAULT_CHUNK_SIZE)
    }

    /// Create a writer that reads source files in `chunk_size` pieces.
    pub fn with_chunk_size(writer: W, chunk_size: usize) -> Self {
        Self {
            writer,
            chunk_size: chunk_size.max(1),
            summary: ArchiveSummary::default(),
            finished: false,
        }
    }

    /// Counters for the entries written so far.
    pub fn summary(&self) -> &ArchiveSummary {
        &self.summary
    }

    /// Write one source file: header, payload, padding.
    ///
    /// The payload length always matches the size recorded in the header. A
    /// source that shrank while being read is zero-filled; one that grew is cut
    /// off. Both cases mark the entry damaged.
    pub fn write_entry(&mut self, source: &SourceFile) -> Result<EntryLine> {
        let meta = FileMetadata::from_path(&source.path, source.name.as_str())?;
        let encoded = encode(&meta)?;
        self.writer.write_all(&encoded.block)?;

        let damaged = if meta.typeflag.carries_payload() {
            self.write_payload(source, meta.size)?
        } else {
            false
        };

        let mut header = decode(&encoded.block);
        header.damaged = damaged;
        header.truncated = encoded.truncated;
        self.summary.record(&header);

        log::debug!("wrote '{}' ({} bytes)", header.name, header.size);
        Ok(EntryLine {
            index: self.summary.entries,
            header,
        })
    }

    /// Copy exactly `size` bytes from the source. Returns true if it changed size.
    fn write_payload(&mut self, source: &SourceFile, size: u64) -> Result<bool> {
        let mut reader = BufReader::with_capacity(self.chunk_size, File::open(&source.path)?);
        let copied = io::copy(&mut (&mut reader).take(size), &mut self.writer)?;

        let mut damaged = false;
        if copied < size {
            log::warn!(
                "{}: file shrank by {} bytes while archiving, zero-filled",
                source.path.display(),
                size - copied
            );
            io::copy(&mut io::repeat(0).take(size - copied), &mut self.writer)?;
            damaged = true;
        } else if reader.read(&mut [0u8; 1])? > 0 {
            log::warn!(
                "{}: file grew while archiving, extra bytes not stored",
                source.path.display()
            );
            damaged = true;
        }

        self.writer.write_all(&ZERO_BLOCK[..padding_for(size)])?;
        Ok(damaged)
    }

    /// Write the end-of-archive marker. Calling it again does nothing.
    pub fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.writer.write_all(&[0u8; END_MARKER_LEN])?;
            self.writer.flush()?;
            self.finished = true;
        }
        Ok(())
    }

    /// Finish the archive and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{ListOptions, list_stream};
    use blocktar_core::block::BLOCK_SIZE;
    use blocktar_core::entry::TypeFlag;
    use std::fs;
    use std::io::Cursor;

    fn source(dir: &std::path::Path, name: &str, data: &[u8]) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        SourceFile {
            path,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_write_entries() {
        let dir = tempfile::tempdir().unwrap();
        let a = source(dir.path(), "a.txt", b"hello");
        let b = source(dir.path(), "b.bin", &[1u8; 600]);

        let mut writer = ArchiveWriter::new(Vec::new());
        let first = writer.write_entry(&a).unwrap();
        let second = writer.write_entry(&b).unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(second.index, 2);
        assert_eq!(second.header.size, 600);
        assert_eq!(writer.summary().total_size, 605);

        let out = writer.into_inner().unwrap();
        // header + 1 block, header + 2 blocks, marker
        assert_eq!(out.len(), BLOCK_SIZE * 5 + END_MARKER_LEN);
        assert!(out[out.len() - END_MARKER_LEN..].iter().all(|&b| b == 0));
        assert_eq!(&out[BLOCK_SIZE..BLOCK_SIZE + 5], b"hello");

        let body = &out[..out.len() - END_MARKER_LEN];
        let summary = list_stream(Cursor::new(body), &ListOptions::default(), |_| {}).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.damaged, 0);
    }

    #[test]
    fn test_finish_once() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.into_inner().unwrap().len(), END_MARKER_LEN);
    }

    #[test]
    fn test_payload_matches_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let file = source(dir.path(), "f", b"0123456789");

        // simulate a file that shrank after it was stat'ed
        let mut writer = ArchiveWriter::new(Vec::new());
        let damaged = writer.write_payload(&file, 16).unwrap();
        assert!(damaged);
        let out = writer.writer;
        assert_eq!(out.len(), BLOCK_SIZE);
        assert_eq!(&out[..10], b"0123456789");
        assert!(out[10..].iter().all(|&b| b == 0));

        // and one that grew
        let mut writer = ArchiveWriter::new(Vec::new());
        let damaged = writer.write_payload(&file, 4).unwrap();
        assert!(damaged);
        assert_eq!(&writer.writer[..4], b"0123");
        assert!(writer.writer[4..].iter().all(|&b| b == 0));

        let mut writer = ArchiveWriter::new(Vec::new());
        assert!(!writer.write_payload(&file, 10).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_has_no_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link");
        std::os::unix::fs::symlink("target.txt", &path).unwrap();

        let mut writer = ArchiveWriter::new(Vec::new());
        let line = writer
            .write_entry(&SourceFile {
                path,
                name: "link".into(),
            })
            .unwrap();
        assert_eq!(line.header.typeflag, TypeFlag::SymLink);
        assert_eq!(line.header.linkname, "target.txt");
        assert_eq!(writer.into_inner().unwrap().len(), BLOCK_SIZE + END_MARKER_LEN);
    }
}
