//! Bitrot checksum algorithms
//!
//! Shards are protected either by a single whole-file digest or by a
//! streaming layout where every shard block is preceded by its own digest.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Algorithm used to detect silent corruption of shard data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BitrotAlgorithm {
    /// SHA-256 over the whole shard file
    #[display("sha256")]
    Sha256,
    /// Streaming xxHash64, one digest per shard block
    #[default]
    #[display("xxhash64s")]
    XxHash64S,
    /// Streaming CRC32C, one digest per shard block
    #[display("crc32cs")]
    Crc32cS,
}

impl BitrotAlgorithm {
    /// Whether digests are interleaved with each shard block
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::XxHash64S | Self::Crc32cS)
    }

    /// Digest length in bytes
    #[must_use]
    pub const fn digest_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::XxHash64S => 8,
            Self::Crc32cS => 4,
        }
    }

    /// Start a new hasher for this algorithm
    #[must_use]
    pub fn hasher(&self) -> BitrotHasher {
        match self {
            Self::Sha256 => BitrotHasher::Sha256(Sha256::new()),
            Self::XxHash64S => BitrotHasher::XxHash64(xxhash_rust::xxh64::Xxh64::new(0)),
            Self::Crc32cS => BitrotHasher::Crc32c(0),
        }
    }

    /// Compute the digest of `data` in one shot
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

impl FromStr for BitrotAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "xxhash64s" => Ok(Self::XxHash64S),
            "crc32cs" => Ok(Self::Crc32cS),
            other => Err(format!("unknown bitrot algorithm: {other}")),
        }
    }
}

/// Incremental digest state for a [`BitrotAlgorithm`]
pub enum BitrotHasher {
    Sha256(Sha256),
    XxHash64(xxhash_rust::xxh64::Xxh64),
    Crc32c(u32),
}

impl BitrotHasher {
    /// Feed more data into the hasher
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::XxHash64(h) => h.update(data),
            Self::Crc32c(crc) => *crc = crc32c::crc32c_append(*crc, data),
        }
    }

    /// Finalize and return the digest bytes (big-endian for integer digests)
    #[must_use]
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::XxHash64(h) => h.digest().to_be_bytes().to_vec(),
            Self::Crc32c(crc) => crc.to_be_bytes().to_vec(),
        }
    }
}

/// Size on disk of a shard file holding `size` bytes of shard data
///
/// Streaming algorithms store one digest in front of every `shard_size`
/// block, so the file grows by `ceil(size / shard_size) * digest_len`.
#[must_use]
pub fn bitrot_shard_file_size(size: u64, shard_size: u64, algorithm: BitrotAlgorithm) -> u64 {
    if !algorithm.is_streaming() || shard_size == 0 {
        return size;
    }
    size.div_ceil(shard_size) * algorithm.digest_len() as u64 + size
}

/// Lay out `data` in the streaming bitrot format (digest, block, digest, ...)
#[must_use]
pub fn encode_streaming(data: &[u8], shard_size: usize, algorithm: BitrotAlgorithm) -> Vec<u8> {
    if shard_size == 0 {
        return data.to_vec();
    }
    let blocks = data.len().div_ceil(shard_size);
    let mut out = Vec::with_capacity(data.len() + blocks * algorithm.digest_len());
    for block in data.chunks(shard_size) {
        out.extend_from_slice(&algorithm.digest(block));
        out.extend_from_slice(block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_lengths() {
        for algo in [
            BitrotAlgorithm::Sha256,
            BitrotAlgorithm::XxHash64S,
            BitrotAlgorithm::Crc32cS,
        ] {
            assert_eq!(algo.digest(b"hello, world!").len(), algo.digest_len());
        }
    }

    #[test]
    fn test_streaming_hasher_matches_one_shot() {
        let mut hasher = BitrotAlgorithm::XxHash64S.hasher();
        hasher.update(b"hello, ");
        hasher.update(b"world!");
        assert_eq!(
            hasher.finalize(),
            BitrotAlgorithm::XxHash64S.digest(b"hello, world!")
        );
    }

    #[test]
    fn test_shard_file_size() {
        // 10 bytes in 4-byte blocks = 3 blocks, 8-byte digest each
        assert_eq!(bitrot_shard_file_size(10, 4, BitrotAlgorithm::XxHash64S), 34);
        assert_eq!(bitrot_shard_file_size(10, 4, BitrotAlgorithm::Sha256), 10);
        assert_eq!(bitrot_shard_file_size(0, 4, BitrotAlgorithm::Crc32cS), 0);
    }

    #[test]
    fn test_encode_streaming_layout() {
        let data = b"abcdefghij";
        let encoded = encode_streaming(data, 4, BitrotAlgorithm::Crc32cS);
        assert_eq!(
            encoded.len() as u64,
            bitrot_shard_file_size(10, 4, BitrotAlgorithm::Crc32cS)
        );
        assert_eq!(&encoded[..4], BitrotAlgorithm::Crc32cS.digest(b"abcd").as_slice());
        assert_eq!(&encoded[4..8], b"abcd");
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA256".parse::<BitrotAlgorithm>(), Ok(BitrotAlgorithm::Sha256));
        assert_eq!(BitrotAlgorithm::XxHash64S.to_string(), "xxhash64s");
        assert!("md5".parse::<BitrotAlgorithm>().is_err());
    }
}
