use std::collections::HashMap;

use log::trace;

use crate::algorithm::{Digest, HashAlgorithm};
use crate::error::CompareError;
use crate::source::BlockSource;

/// Counters describing how much hashing work a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of times the hash algorithm was invoked.
    pub hashes_computed: u64,
    /// Number of block requests answered from a track.
    pub blocks_reused: u64,
    /// Number of registered files.
    pub tracks: usize,
}

/// Per-file, per-block memo of block digests for a single run.
///
/// `HashCache` maps a file id (the file's position in the candidate list) to
/// its track: the digests of blocks `0..k` of that file, in order. A track only
/// ever grows by appending the next block, so each block of each file is hashed
/// at most once no matter how many comparisons touch it.
///
/// The cache holds no file handles. Callers pass the read cursor they opened for
/// the current comparison, and the cache either reads the next block from it or,
/// when the digest is already known, just skips the cursor forward.
pub struct HashCache {
    algorithm: HashAlgorithm,
    tracks: HashMap<usize, Vec<Digest>>,
    /// Scratch space for one block, reused across reads.
    buffer: Vec<u8>,
    hashes_computed: u64,
    blocks_reused: u64,
}

impl HashCache {
    /// Creates an empty cache hashing blocks of `block_size` bytes with `algorithm`.
    pub fn new(algorithm: HashAlgorithm, block_size: usize) -> Self {
        Self {
            algorithm,
            tracks: HashMap::new(),
            buffer: vec![0; block_size],
            hashes_computed: 0,
            blocks_reused: 0,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn block_size(&self) -> usize {
        self.buffer.len()
    }

    /// Creates an empty track for `file_id` unless it already has one.
    pub fn register(&mut self, file_id: usize) {
        self.tracks.entry(file_id).or_default();
    }

    /// Returns the digest of block `block_index` of `file_id`.
    ///
    /// If the digest is cached, `source` is only skipped forward by one block.
    /// Otherwise exactly one block is read from `source`, hashed and appended to
    /// the track. `block_index` may be at most the current track length.
    ///
    /// # Errors
    ///
    /// Returns the source's error if it cannot be read or skipped, in which case
    /// the track is left as it was. Asking for an unregistered file or for a
    /// block beyond the next unread one is reported rather than panicking.
    pub fn ensure_block<S>(
        &mut self,
        file_id: usize,
        block_index: usize,
        source: &mut S,
    ) -> Result<Digest, CompareError>
    where
        S: BlockSource + ?Sized,
    {
        let track = self
            .tracks
            .get_mut(&file_id)
            .ok_or(CompareError::Unregistered { file_id })?;

        if let Some(&digest) = track.get(block_index) {
            source.skip_block()?;
            self.blocks_reused += 1;
            return Ok(digest);
        }

        if block_index != track.len() {
            return Err(CompareError::OutOfOrder {
                file_id,
                block: block_index,
                len: track.len(),
            });
        }

        let len = source.read_block(&mut self.buffer)?;
        let digest = self.algorithm.hash(&self.buffer[..len]);
        track.push(digest);
        self.hashes_computed += 1;
        trace!("File #{} block {}: {} ({} bytes)", file_id, block_index, digest, len);
        Ok(digest)
    }

    /// True if both files have a digest at `block_index` and the digests agree.
    pub fn equal(&self, file_a: usize, file_b: usize, block_index: usize) -> bool {
        match (self.digest(file_a, block_index), self.digest(file_b, block_index)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn digest(&self, file_id: usize, block_index: usize) -> Option<Digest> {
        self.tracks.get(&file_id)?.get(block_index).copied()
    }

    /// Number of blocks hashed so far for `file_id`, or `None` if unregistered.
    pub fn track_len(&self, file_id: usize) -> Option<usize> {
        self.tracks.get(&file_id).map(Vec::len)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hashes_computed: self.hashes_computed,
            blocks_reused: self.blocks_reused,
            tracks: self.tracks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// In-memory cursor that records how it was driven.
    struct SliceSource<'a> {
        data: &'a [u8],
        pos: usize,
        block_size: usize,
        reads: usize,
        skips: usize,
        fail: bool,
    }

    impl<'a> SliceSource<'a> {
        fn new(data: &'a [u8], block_size: usize) -> Self {
            Self {
                data,
                pos: 0,
                block_size,
                reads: 0,
                skips: 0,
                fail: false,
            }
        }
    }

    impl BlockSource for SliceSource<'_> {
        fn read_block(&mut self, buf: &mut [u8]) -> Result<usize, CompareError> {
            if self.fail {
                return Err(CompareError::Read {
                    path: "slice".into(),
                    block: self.pos / self.block_size,
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "revoked"),
                });
            }
            let len = (self.data.len() - self.pos).min(buf.len());
            buf[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
            self.pos += len;
            self.reads += 1;
            Ok(len)
        }

        fn skip_block(&mut self) -> Result<(), CompareError> {
            self.pos = (self.pos + self.block_size).min(self.data.len());
            self.skips += 1;
            Ok(())
        }

        fn is_at_end(&self) -> bool {
            self.pos == self.data.len()
        }
    }

    #[test]
    fn register_does_not_reset_a_track() {
        let data = [1u8; 16];
        let mut cache = HashCache::new(HashAlgorithm::FastHash, 8);
        cache.register(0);
        cache
            .ensure_block(0, 0, &mut SliceSource::new(&data, 8))
            .unwrap();

        cache.register(0);
        assert_eq!(cache.track_len(0), Some(1));
    }

    #[test]
    fn cached_block_skips_instead_of_reading() {
        let data = [3u8; 24];
        let mut cache = HashCache::new(HashAlgorithm::Checksum, 8);
        cache.register(4);

        let mut first = SliceSource::new(&data, 8);
        let d0 = cache.ensure_block(4, 0, &mut first).unwrap();
        let d1 = cache.ensure_block(4, 1, &mut first).unwrap();
        assert_eq!(first.reads, 2);

        let mut second = SliceSource::new(&data, 8);
        assert_eq!(cache.ensure_block(4, 0, &mut second).unwrap(), d0);
        assert_eq!(cache.ensure_block(4, 1, &mut second).unwrap(), d1);
        assert_eq!((second.reads, second.skips), (0, 2));

        // The skipped cursor is positioned to read the third block itself.
        cache.ensure_block(4, 2, &mut second).unwrap();
        assert_eq!(second.reads, 1);
        assert!(second.is_at_end());

        let stats = cache.stats();
        assert_eq!(stats.hashes_computed, 3);
        assert_eq!(stats.blocks_reused, 2);
        assert_eq!(stats.tracks, 1);
    }

    #[test]
    fn short_final_block_is_hashed_on_its_own_bytes() {
        let data = b"0123456789";
        let mut cache = HashCache::new(HashAlgorithm::FastHash, 8);
        cache.register(0);
        let mut source = SliceSource::new(data, 8);
        cache.ensure_block(0, 0, &mut source).unwrap();
        let tail = cache.ensure_block(0, 1, &mut source).unwrap();
        assert_eq!(tail, HashAlgorithm::FastHash.hash(b"89"));
    }

    #[test]
    fn equal_compares_digests_at_index() {
        let mut cache = HashCache::new(HashAlgorithm::ContentDigest, 4);
        for id in 0..3 {
            cache.register(id);
        }
        cache.ensure_block(0, 0, &mut SliceSource::new(b"abcd", 4)).unwrap();
        cache.ensure_block(1, 0, &mut SliceSource::new(b"abcd", 4)).unwrap();
        cache.ensure_block(2, 0, &mut SliceSource::new(b"abce", 4)).unwrap();

        assert!(cache.equal(0, 1, 0));
        assert!(!cache.equal(0, 2, 0));
        assert!(!cache.equal(0, 1, 1));
    }

    #[test]
    fn failed_read_leaves_track_unchanged() {
        let data = [0u8; 16];
        let mut cache = HashCache::new(HashAlgorithm::FastHash, 8);
        cache.register(0);
        let mut source = SliceSource::new(&data, 8);
        cache.ensure_block(0, 0, &mut source).unwrap();
        source.fail = true;

        assert!(matches!(
            cache.ensure_block(0, 1, &mut source),
            Err(CompareError::Read { .. })
        ));
        assert_eq!(cache.track_len(0), Some(1));
        assert_eq!(cache.stats().hashes_computed, 1);
    }

    #[test]
    fn contract_violations_are_errors() {
        let data = [0u8; 32];
        let mut cache = HashCache::new(HashAlgorithm::FastHash, 8);
        assert!(matches!(
            cache.ensure_block(9, 0, &mut SliceSource::new(&data, 8)),
            Err(CompareError::Unregistered { file_id: 9 })
        ));

        cache.register(9);
        assert!(matches!(
            cache.ensure_block(9, 2, &mut SliceSource::new(&data, 8)),
            Err(CompareError::OutOfOrder { block: 2, len: 0, .. })
        ));
    }
}
