use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_64;

/// Width of a [`Digest::Content`] value in bytes.
pub const CONTENT_DIGEST_LEN: usize = 16;

/// The hash applied to every block during a run.
///
/// One algorithm is active for the whole run; digests produced by different
/// algorithms are never compared against each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// 64-bit XXH3, the cheapest way to tell two blocks apart.
    #[default]
    #[value(name = "fast", alias = "0")]
    #[serde(alias = "fast", alias = "0")]
    FastHash,
    /// 128 bits of BLAKE3 output, for large corpora where collisions matter.
    #[value(name = "digest", alias = "1")]
    #[serde(alias = "digest", alias = "1")]
    ContentDigest,
    /// CRC-32.
    #[value(name = "crc32", alias = "2")]
    #[serde(alias = "crc32", alias = "2")]
    Checksum,
}

impl HashAlgorithm {
    pub fn hash(&self, block: &[u8]) -> Digest {
        match self {
            HashAlgorithm::FastHash => Digest::Fast(xxh3_64(block)),
            HashAlgorithm::ContentDigest => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(block);
                let mut out = [0u8; CONTENT_DIGEST_LEN];
                hasher.finalize_xof().fill(&mut out);
                Digest::Content(out)
            }
            HashAlgorithm::Checksum => Digest::Checksum(crc32fast::hash(block)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::FastHash => "xxh3-64",
            HashAlgorithm::ContentDigest => "blake3-128",
            HashAlgorithm::Checksum => "crc32",
        }
    }
}

/// The hash of a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Digest {
    Fast(u64),
    Content([u8; CONTENT_DIGEST_LEN]),
    Checksum(u32),
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Digest::Fast(value) => write!(f, "{value:016x}"),
            Digest::Content(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02x}")),
            Digest::Checksum(value) => write!(f, "{value:08x}"),
        }
    }
}
