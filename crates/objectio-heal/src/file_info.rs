//! Per-disk object metadata record
//!
//! Every disk in an erasure set keeps its own copy of the metadata for each
//! object version. The copies are compared against each other to decide
//! which version is authoritative and which disks need healing.

use chrono::{DateTime, Utc};
use objectio_common::BitrotAlgorithm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Erasure coding layout of one object version as seen by one disk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureInfo {
    /// Erasure algorithm name (e.g. "reedsolomon")
    #[serde(default)]
    pub algorithm: String,
    /// Number of data shards
    pub data_blocks: usize,
    /// Number of parity shards
    pub parity_blocks: usize,
    /// Size of a stripe before splitting into shards
    pub block_size: u64,
    /// Shard index held by this disk (1-based)
    pub index: usize,
    /// Slot to shard-index map for the whole set (1-based values)
    #[serde(default)]
    pub distribution: Vec<usize>,
    /// Bitrot checksums, one entry per part
    #[serde(default)]
    pub checksums: Vec<ChecksumInfo>,
}

impl ErasureInfo {
    /// Size of one shard of a full stripe
    #[must_use]
    pub fn shard_size(&self) -> u64 {
        if self.data_blocks == 0 {
            return 0;
        }
        self.block_size.div_ceil(self.data_blocks as u64)
    }

    /// Total shard data held by one disk for an object of `total_length` bytes
    #[must_use]
    pub fn shard_file_size(&self, total_length: u64) -> u64 {
        if total_length == 0 || self.block_size == 0 || self.data_blocks == 0 {
            return 0;
        }
        let full_stripes = total_length / self.block_size;
        let last_block = total_length % self.block_size;
        let last_shard = last_block.div_ceil(self.data_blocks as u64);
        full_stripes * self.shard_size() + last_shard
    }

    /// Checksum entry for a part, or an empty entry with the default algorithm
    #[must_use]
    pub fn get_checksum_info(&self, part_number: u32) -> ChecksumInfo {
        self.checksums
            .iter()
            .find(|c| c.part_number == part_number)
            .cloned()
            .unwrap_or_else(|| ChecksumInfo {
                part_number,
                algorithm: BitrotAlgorithm::default(),
                hash: Vec::new(),
            })
    }
}

/// Bitrot checksum of one part's shard on one disk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumInfo {
    pub part_number: u32,
    pub algorithm: BitrotAlgorithm,
    /// Whole-file digest; empty for streaming algorithms
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub hash: Vec<u8>,
}

/// One part of a (possibly multipart) object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPartInfo {
    pub number: u32,
    /// Logical size of the part in bytes
    pub size: u64,
    /// Size before compression, if any
    #[serde(default)]
    pub actual_size: u64,
}

/// Status of a transition to a remote tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStatus {
    Pending,
    Complete,
}

/// Remote tier holding the object data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub tier: String,
    pub status: TransitionStatus,
}

/// One disk's view of an object version
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Bucket
    #[serde(default)]
    pub volume: String,
    /// Object name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version_id: Option<Uuid>,
    /// Last write time; `None` when nothing readable was found
    #[serde(default)]
    pub mod_time: Option<DateTime<Utc>>,
    /// Directory holding this version's shards
    #[serde(default)]
    pub data_dir: Option<Uuid>,
    /// Delete marker, no shard data expected
    #[serde(default)]
    pub deleted: bool,
    /// Written in the legacy metadata format
    #[serde(default)]
    pub xlv1: bool,
    /// Logical object size
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub erasure: ErasureInfo,
    #[serde(default)]
    pub parts: Vec<ObjectPartInfo>,
    /// Inline shard bytes for small objects
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub transition: Option<TransitionInfo>,
}

impl FileInfo {
    /// Structural validity of the record
    ///
    /// Delete markers carry no erasure layout and are always valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.deleted {
            return true;
        }
        let data = self.erasure.data_blocks;
        let parity = self.erasure.parity_blocks;
        let correct_indexes = self.erasure.index > 0
            && self.erasure.index <= data + parity
            && self.erasure.distribution.len() == data + parity;
        data >= parity && data != 0 && parity != 0 && correct_indexes
    }

    /// Data lives on a remote tier rather than on the local disks
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.transition
            .as_ref()
            .is_some_and(|t| t.status == TransitionStatus::Complete)
    }

    /// Shard data is embedded in the record (or the object is empty)
    #[must_use]
    pub fn has_inline_data(&self) -> bool {
        (!self.data.is_empty() || self.size == 0) && !self.parts.is_empty()
    }
}

/// Serde helper for byte fields stored as base64 strings
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
