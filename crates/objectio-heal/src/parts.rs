//! Per-disk availability and integrity verification
//!
//! Call with the online disks returned by
//! [`list_online_disks`](crate::reconcile::list_online_disks). Each slot ends
//! up in exactly one of three outcomes:
//! - available: metadata matches `latest` and the shard data verified
//! - errored: the slot's data error says why (unreachable, stale, corrupt)
//! - skipped: structurally invalid metadata while distribution is trusted
//!
//! The caller's metadata is never modified. The returned copy holds `None`
//! for every slot that needs repair, whatever the reason.

use crate::bitrot::bitrot_verify;
use crate::disk::{DiskHandle, DiskSlot};
use crate::distribution::erasure_distribution_reliable;
use crate::file_info::FileInfo;
use futures::future::join_all;
use objectio_common::{DiskError, HealScanMode};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of [`disks_with_all_parts`], one entry per slot
#[derive(Clone)]
pub struct PartsAvailability {
    /// Disks holding the latest version with verified data
    pub available_disks: Vec<DiskSlot>,
    /// Why a slot is not available, if known
    pub data_errs: Vec<Option<DiskError>>,
    /// Updated metadata; `None` marks a slot that needs repair
    pub parts_metadata: Vec<Option<FileInfo>>,
    /// Whether distribution arrays were trusted during this call
    pub distribution_reliable: bool,
}

impl PartsAvailability {
    /// Number of available disks
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available_disks.iter().filter(|d| d.is_some()).count()
    }
}

/// Classify every slot as available or not, verifying shard data
pub async fn disks_with_all_parts(
    online_disks: &[DiskSlot],
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
    latest: &FileInfo,
    bucket: &str,
    object: &str,
    scan_mode: HealScanMode,
) -> PartsAvailability {
    check_all_parts(
        online_disks,
        parts_metadata,
        errs,
        latest,
        bucket,
        object,
        scan_mode,
        None,
    )
    .await
}

/// Like [`disks_with_all_parts`], failing any single disk call that takes
/// longer than `disk_timeout` with [`DiskError::Timeout`]
#[allow(clippy::too_many_arguments)]
pub async fn disks_with_all_parts_timeout(
    online_disks: &[DiskSlot],
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
    latest: &FileInfo,
    bucket: &str,
    object: &str,
    scan_mode: HealScanMode,
    disk_timeout: Duration,
) -> PartsAvailability {
    check_all_parts(
        online_disks,
        parts_metadata,
        errs,
        latest,
        bucket,
        object,
        scan_mode,
        Some(disk_timeout),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn check_all_parts(
    online_disks: &[DiskSlot],
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
    latest: &FileInfo,
    bucket: &str,
    object: &str,
    scan_mode: HealScanMode,
    disk_timeout: Option<Duration>,
) -> PartsAvailability {
    let width = online_disks.len();
    let reliable = erasure_distribution_reliable(parts_metadata, width);

    let mut available_disks: Vec<DiskSlot> = vec![None; width];
    let mut data_errs: Vec<Option<DiskError>> = vec![None; width];
    let mut metas: Vec<Option<FileInfo>> = parts_metadata
        .iter()
        .map(|m| m.is_valid().then(|| m.clone()))
        .collect();

    let liveness = join_all(online_disks.iter().map(|slot| async move {
        let Some(disk) = slot else {
            return Err(DiskError::DiskNotFound);
        };
        let online = match disk_timeout {
            Some(limit) => tokio::time::timeout(limit, disk.is_online())
                .await
                .map_err(|_| DiskError::Timeout)?,
            None => disk.is_online().await,
        };
        if online { Ok(()) } else { Err(DiskError::DiskNotFound) }
    }))
    .await;

    let mut pending: Vec<(usize, DiskHandle, FileInfo)> = Vec::new();
    for (i, slot) in online_disks.iter().enumerate() {
        if let Some(err) = errs.get(i).cloned().flatten() {
            data_errs[i] = Some(err);
            continue;
        }
        if let Err(err) = &liveness[i] {
            data_errs[i] = Some(err.clone());
            continue;
        }
        let Some(disk) = slot else {
            data_errs[i] = Some(DiskError::DiskNotFound);
            continue;
        };
        let Some(meta) = parts_metadata.get(i) else {
            data_errs[i] = Some(DiskError::FileNotFound);
            continue;
        };

        if meta.mod_time != latest.mod_time || meta.data_dir != latest.data_dir {
            warn!(slot = i, disk = disk.endpoint(), "metadata differs from latest version");
            data_errs[i] = Some(DiskError::FileCorrupt);
            metas[i] = None;
            continue;
        }

        if reliable {
            if !meta.is_valid() {
                continue;
            }
            if !meta.deleted
                && (meta.erasure.distribution.len() != width
                    || meta.erasure.distribution.get(i) != Some(&meta.erasure.index))
            {
                warn!(
                    slot = i,
                    disk = disk.endpoint(),
                    index = meta.erasure.index,
                    "erasure index does not match distribution"
                );
                data_errs[i] = Some(DiskError::FileCorrupt);
                metas[i] = None;
                continue;
            }
        }

        if meta.has_inline_data() {
            match verify_inline_data(meta) {
                Ok(()) => available_disks[i] = Some(disk.clone()),
                Err(err) => {
                    warn!(slot = i, disk = disk.endpoint(), error = %err, "inline data failed verification");
                    data_errs[i] = Some(err);
                    metas[i] = None;
                }
            }
            continue;
        }

        let mut meta = meta.clone();
        meta.data_dir = latest.data_dir;
        pending.push((i, disk.clone(), meta));
    }

    let results = join_all(pending.into_iter().map(|(i, disk, meta)| async move {
        let result = verify_on_disk(&disk, bucket, object, &meta, scan_mode, disk_timeout).await;
        (i, disk, result)
    }))
    .await;

    for (i, disk, result) in results {
        match result {
            Ok(()) => available_disks[i] = Some(disk),
            Err(err) => {
                debug!(slot = i, disk = disk.endpoint(), error = %err, %scan_mode, "shard verification failed");
                data_errs[i] = Some(err);
                metas[i] = None;
            }
        }
    }

    PartsAvailability {
        available_disks,
        data_errs,
        parts_metadata: metas,
        distribution_reliable: reliable,
    }
}

/// Bitrot-check shard bytes embedded in the metadata record
fn verify_inline_data(meta: &FileInfo) -> Result<(), DiskError> {
    let Some(part) = meta.parts.first() else {
        return Err(DiskError::FileCorrupt);
    };
    let checksum = meta.erasure.get_checksum_info(part.number);
    bitrot_verify(
        &mut Cursor::new(&meta.data),
        meta.data.len() as u64,
        meta.erasure.shard_file_size(meta.size),
        checksum.algorithm,
        &checksum.hash,
        meta.erasure.shard_size(),
    )
}

async fn verify_on_disk(
    disk: &DiskHandle,
    bucket: &str,
    object: &str,
    meta: &FileInfo,
    scan_mode: HealScanMode,
    disk_timeout: Option<Duration>,
) -> Result<(), DiskError> {
    if meta.deleted || meta.is_remote() {
        return Ok(());
    }
    let check = async {
        match scan_mode {
            HealScanMode::Deep => disk.verify_file(bucket, object, meta).await,
            HealScanMode::Normal => disk.check_parts(bucket, object, meta).await,
        }
    };
    match disk_timeout {
        Some(limit) => tokio::time::timeout(limit, check)
            .await
            .unwrap_or(Err(DiskError::Timeout)),
        None => check.await,
    }
}
