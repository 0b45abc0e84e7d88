//! ObjectIO Heal - erasure-set reconciliation
//!
//! Every disk in an erasure set keeps its own copy of each object's
//! metadata. This crate decides which copy is authoritative, which disks
//! hold it, and which of those disks actually have intact shard data:
//!
//! 1. [`reconcile::get_latest_file_info`] picks the version agreed on by a
//!    quorum of disks
//! 2. [`reconcile::list_online_disks`] keeps the disks holding that version
//! 3. [`parts::disks_with_all_parts`] verifies shard data on those disks
//! 4. [`state::classify_drives`] labels each drive for the healer
//!
//! [`healer::ObjectHealer`] runs the whole pass for one object.

pub mod bitrot;
pub mod disk;
pub mod distribution;
pub mod file_info;
pub mod healer;
pub mod local;
pub mod modtime;
pub mod parts;
pub mod quorum;
pub mod reconcile;
pub mod state;

#[cfg(test)]
mod mock;

pub use disk::{DiskHandle, DiskSlot, StorageDisk};
pub use file_info::{ChecksumInfo, ErasureInfo, FileInfo, ObjectPartInfo, TransitionInfo, TransitionStatus};
pub use healer::{DriveReport, ObjectHealer, ObjectScanReport};
pub use local::LocalDisk;
pub use modtime::common_time;
pub use parts::{PartsAvailability, disks_with_all_parts, disks_with_all_parts_timeout};
pub use reconcile::{filter_online_disks_by_format, get_latest_file_info, list_online_disks};
pub use state::{classify_drives, outdated_disks};
