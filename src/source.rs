use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use crate::error::CompareError;
use crate::utils::FileInfo;

/// A sequential read cursor over one file, advanced one block at a time.
pub trait BlockSource {
    /// Reads the next block into `buf`, returning how many bytes were filled.
    ///
    /// A full block is `buf.len()` bytes; the last block of a file may be shorter.
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CompareError>;

    /// Moves past the next block without reading it.
    fn skip_block(&mut self) -> Result<(), CompareError>;

    fn is_at_end(&self) -> bool;
}

/// Opens a fresh, independent [`BlockSource`] for a candidate file.
pub trait SourceOpener {
    type Source: BlockSource;

    fn open(&self, file: &FileInfo) -> Result<Self::Source, CompareError>;
}

impl<T: SourceOpener + ?Sized> SourceOpener for &T {
    type Source = T::Source;

    fn open(&self, file: &FileInfo) -> Result<Self::Source, CompareError> {
        (**self).open(file)
    }
}

/// A buffered file handle bounded by the size recorded at listing time.
pub struct FileCursor {
    path: PathBuf,
    reader: BufReader<File>,
    block_size: usize,
    remaining: u64,
    block: usize,
}

impl FileCursor {
    pub fn open(file: &FileInfo, block_size: usize) -> Result<Self, CompareError> {
        let handle = File::open(&file.path).map_err(|source| CompareError::Open {
            path: file.path.clone(),
            source,
        })?;
        Ok(Self {
            path: file.path.clone(),
            reader: BufReader::new(handle),
            block_size,
            remaining: file.size,
            block: 0,
        })
    }

    fn next_len(&self) -> usize {
        self.remaining.min(self.block_size as u64) as usize
    }

    fn advance(&mut self, len: usize) {
        self.remaining -= len as u64;
        self.block += 1;
    }

    fn read_error(&self, source: std::io::Error) -> CompareError {
        CompareError::Read {
            path: self.path.clone(),
            block: self.block,
            source,
        }
    }
}

impl BlockSource for FileCursor {
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CompareError> {
        let len = self.next_len().min(buf.len());
        // A file truncated since listing fails here with UnexpectedEof.
        if let Err(e) = self.reader.read_exact(&mut buf[..len]) {
            return Err(self.read_error(e));
        }
        self.advance(len);
        Ok(len)
    }

    fn skip_block(&mut self) -> Result<(), CompareError> {
        let len = self.next_len();
        if let Err(e) = self.reader.seek_relative(len as i64) {
            return Err(self.read_error(e));
        }
        self.advance(len);
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.remaining == 0
    }
}

/// Opens candidates from the filesystem.
#[derive(Debug, Clone, Copy)]
pub struct FsOpener {
    block_size: usize,
}

impl FsOpener {
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl SourceOpener for FsOpener {
    type Source = FileCursor;

    fn open(&self, file: &FileInfo) -> Result<FileCursor, CompareError> {
        FileCursor::open(file, self.block_size)
    }
}
