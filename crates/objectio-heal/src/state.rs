//! Drive-state classification
//!
//! Turns the per-slot outcome of a verification pass into a [`DriveState`]
//! so the healer knows which drives to rewrite and which to leave alone.

use crate::disk::DiskSlot;
use crate::file_info::FileInfo;
use crate::parts::PartsAvailability;
use objectio_common::{DiskError, DriveState, ErrorClass};

fn state_for_error(err: &DiskError) -> DriveState {
    match err.class() {
        ErrorClass::Unreachable | ErrorClass::Other => DriveState::Offline,
        ErrorClass::Missing => DriveState::Missing,
        ErrorClass::StructuralCorruption | ErrorClass::IntegrityMismatch => DriveState::Corrupt,
    }
}

/// Per-slot drive state
///
/// `disks`, `parts_metadata` and `errs` are the inputs of the pass (before
/// online filtering); `availability` is its result.
#[must_use]
pub fn classify_drives(
    disks: &[DiskSlot],
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
    latest: &FileInfo,
    availability: &PartsAvailability,
) -> Vec<DriveState> {
    (0..disks.len())
        .map(|i| {
            if availability.available_disks.get(i).is_some_and(Option::is_some) {
                return DriveState::Ok;
            }
            if disks[i].is_none() {
                return DriveState::Offline;
            }
            if let Some(err) = errs.get(i).and_then(Option::as_ref) {
                return state_for_error(err);
            }
            let Some(meta) = parts_metadata.get(i) else {
                return DriveState::Missing;
            };
            if meta.mod_time != latest.mod_time
                || meta.data_dir != latest.data_dir
                || meta.xlv1 != latest.xlv1
            {
                return DriveState::Outdated;
            }
            if !meta.is_valid() {
                return DriveState::Corrupt;
            }
            match availability.data_errs.get(i).and_then(Option::as_ref) {
                Some(err) => state_for_error(err),
                None => DriveState::Corrupt,
            }
        })
        .collect()
}

/// Reachable disks whose copy must be rewritten
#[must_use]
pub fn outdated_disks(disks: &[DiskSlot], states: &[DriveState]) -> Vec<DiskSlot> {
    disks
        .iter()
        .zip(states)
        .map(|(disk, state)| if state.needs_heal() { disk.clone() } else { None })
        .collect()
}
