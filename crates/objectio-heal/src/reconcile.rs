//! Online-disk derivation and latest-version selection
//!
//! Pure reductions over slot-aligned arrays. Nothing here touches a disk.

use crate::disk::DiskSlot;
use crate::file_info::FileInfo;
use crate::modtime::{common_time, list_object_modtimes};
use crate::quorum::reduce_read_quorum_errs;
use chrono::{DateTime, Utc};
use objectio_common::{DiskError, Error, Result};
use tracing::debug;

/// Disks holding the majority version, plus that version's time
///
/// A slot stays online only if its record is valid and its time equals the
/// common time; every other slot is `None` in the returned array.
#[must_use]
pub fn list_online_disks(
    disks: &[DiskSlot],
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
) -> (Vec<DiskSlot>, Option<DateTime<Utc>>) {
    let mod_times = list_object_modtimes(parts_metadata, errs);
    let mod_time = common_time(&mod_times);

    let online_disks = mod_times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let matches = t.is_some() && *t == mod_time;
            if matches && parts_metadata[i].is_valid() {
                disks.get(i).cloned().flatten()
            } else {
                None
            }
        })
        .collect();

    (online_disks, mod_time)
}

/// Drop slots written in a different metadata format than `fi`
#[must_use]
pub fn filter_online_disks_by_format(
    fi: &FileInfo,
    parts_metadata: &[FileInfo],
    online_disks: &[DiskSlot],
) -> Vec<DiskSlot> {
    online_disks
        .iter()
        .zip(parts_metadata)
        .map(|(disk, meta)| if meta.xlv1 == fi.xlv1 { disk.clone() } else { None })
        .collect()
}

/// Pick the record agreed on by a quorum of disks
///
/// Quorum is the record's own data block count, since erasure parameters can
/// differ between objects and versions.
pub fn get_latest_file_info(
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
) -> Result<FileInfo> {
    let failed = errs
        .iter()
        .flatten()
        .filter(|e| !e.is_object_op_ignored())
        .count();
    if failed > errs.len() / 2 {
        debug!(failed, total = errs.len(), "too many metadata reads failed");
        return Err(Error::ErasureReadQuorum);
    }
    if let Err(err) = reduce_read_quorum_errs(errs, parts_metadata.len() / 2) {
        debug!(error = %err, "metadata reads do not reach read quorum");
        return Err(Error::ErasureReadQuorum);
    }

    let mod_times = list_object_modtimes(parts_metadata, errs);
    let Some(mod_time) = common_time(&mod_times) else {
        return Err(Error::ErasureReadQuorum);
    };

    let mut count = 0;
    let mut latest: Option<&FileInfo> = None;
    for (i, t) in mod_times.iter().enumerate() {
        if *t == Some(mod_time) && parts_metadata[i].is_valid() {
            latest = Some(&parts_metadata[i]);
            count += 1;
        }
    }

    let Some(latest) = latest else {
        return Err(Error::ErasureReadQuorum);
    };

    if count < latest.erasure.data_blocks {
        debug!(
            count,
            required = latest.erasure.data_blocks,
            %mod_time,
            "not enough disks agree on latest version"
        );
        return Err(Error::ErasureReadQuorum);
    }

    Ok(latest.clone())
}
