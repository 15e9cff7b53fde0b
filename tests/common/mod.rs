#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use match_file_dups::{BlockSource, CompareError, FileInfo, SourceOpener};

/// Serves candidate contents from memory, optionally failing one block of a file.
pub struct MemoryOpener {
    contents: HashMap<PathBuf, Rc<[u8]>>,
    failures: HashMap<PathBuf, usize>,
    block_size: usize,
    pub opened: Cell<usize>,
}

impl MemoryOpener {
    pub fn new(files: &[FileInfo], contents: &[Vec<u8>], block_size: usize) -> Self {
        Self {
            contents: files
                .iter()
                .zip(contents)
                .map(|(file, data)| (file.path.clone(), Rc::from(data.as_slice())))
                .collect(),
            failures: HashMap::new(),
            block_size,
            opened: Cell::new(0),
        }
    }

    /// Makes every read of `block` of `path` fail.
    pub fn fail_block(mut self, path: &PathBuf, block: usize) -> Self {
        self.failures.insert(path.clone(), block);
        self
    }
}

pub struct MemorySource {
    path: PathBuf,
    data: Rc<[u8]>,
    pos: usize,
    block: usize,
    block_size: usize,
    fail_at: Option<usize>,
}

impl BlockSource for MemorySource {
    fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CompareError> {
        if self.fail_at == Some(self.block) {
            return Err(CompareError::Read {
                path: self.path.clone(),
                block: self.block,
                source: io::Error::new(io::ErrorKind::PermissionDenied, "permission revoked"),
            });
        }
        let len = (self.data.len() - self.pos).min(buf.len());
        buf[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        self.block += 1;
        Ok(len)
    }

    fn skip_block(&mut self) -> Result<(), CompareError> {
        self.pos = (self.pos + self.block_size).min(self.data.len());
        self.block += 1;
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

impl SourceOpener for MemoryOpener {
    type Source = MemorySource;

    fn open(&self, file: &FileInfo) -> Result<MemorySource, CompareError> {
        let data = self.contents.get(&file.path).cloned().ok_or_else(|| CompareError::Open {
            path: file.path.clone(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })?;
        self.opened.set(self.opened.get() + 1);
        Ok(MemorySource {
            path: file.path.clone(),
            data,
            pos: 0,
            block: 0,
            block_size: self.block_size,
            fail_at: self.failures.get(&file.path).copied(),
        })
    }
}

/// Candidates named `file1`, `file2`, ... with the given contents.
pub fn candidates(contents: &[Vec<u8>]) -> Vec<FileInfo> {
    contents
        .iter()
        .enumerate()
        .map(|(i, data)| FileInfo {
            path: PathBuf::from(format!("file{}", i + 1)),
            size: data.len() as u64,
        })
        .collect()
}
