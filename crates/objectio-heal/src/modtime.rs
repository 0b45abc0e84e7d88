//! Modification-time histogram and majority selection

use crate::file_info::FileInfo;
use chrono::{DateTime, Utc};
use objectio_common::DiskError;
use std::collections::HashMap;

/// Most frequent modification time, ties going to the later time
///
/// Absent entries do not vote. Returns `None` when nothing is present.
#[must_use]
pub fn common_time(mod_times: &[Option<DateTime<Utc>>]) -> Option<DateTime<Utc>> {
    let mut occurrences: HashMap<DateTime<Utc>, usize> = HashMap::with_capacity(mod_times.len());
    for t in mod_times.iter().flatten() {
        *occurrences.entry(*t).or_insert(0) += 1;
    }

    let mut maxima = 0;
    let mut common = None;
    for (t, count) in occurrences {
        let later = common.is_none_or(|c| t > c);
        if count > maxima || (count == maxima && later) {
            maxima = count;
            common = Some(t);
        }
    }
    common
}

/// A time array with every slot absent
#[must_use]
pub fn boot_mod_times(disk_count: usize) -> Vec<Option<DateTime<Utc>>> {
    vec![None; disk_count]
}

/// Per-slot modification times, absent where the metadata read failed
#[must_use]
pub fn list_object_modtimes(
    parts_metadata: &[FileInfo],
    errs: &[Option<DiskError>],
) -> Vec<Option<DateTime<Utc>>> {
    let mut mod_times = boot_mod_times(parts_metadata.len());
    for (i, meta) in parts_metadata.iter().enumerate() {
        if errs.get(i).is_some_and(Option::is_some) {
            continue;
        }
        mod_times[i] = meta.mod_time;
    }
    mod_times
}
