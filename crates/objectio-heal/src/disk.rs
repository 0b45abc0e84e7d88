//! Storage collaborator used by the healing engine
//!
//! The engine never creates or destroys disks; it only reads metadata from
//! them and asks them to verify the shards they hold.

use crate::file_info::FileInfo;
use async_trait::async_trait;
use objectio_common::DiskError;
use std::sync::Arc;

/// One erasure-set member's storage backend
#[async_trait]
pub trait StorageDisk: Send + Sync {
    /// Endpoint string for logging and reports
    fn endpoint(&self) -> &str;

    /// Whether the backend is currently reachable
    async fn is_online(&self) -> bool;

    /// Read this disk's metadata record for an object
    async fn read_version(&self, bucket: &str, object: &str) -> Result<FileInfo, DiskError>;

    /// Deep check: bitrot-verify every shard of every part
    async fn verify_file(&self, bucket: &str, object: &str, fi: &FileInfo)
    -> Result<(), DiskError>;

    /// Light check: every part file is present and not truncated
    async fn check_parts(&self, bucket: &str, object: &str, fi: &FileInfo)
    -> Result<(), DiskError>;
}

/// Shared handle to a disk
pub type DiskHandle = Arc<dyn StorageDisk>;

/// Slot array entry; `None` is the offline value
pub type DiskSlot = Option<DiskHandle>;
