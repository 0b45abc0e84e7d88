//! Erasure distribution trust gate
//!
//! Older CopyObject/PutObjectTags code paths could rewrite the distribution
//! arrays on many disks at once. When most valid records disagree with
//! their own shard index the arrays are not used to invalidate anything.

use crate::file_info::FileInfo;
use tracing::warn;

/// Number of valid, non-deleted records whose distribution disagrees with
/// the set width or with their own shard index
#[must_use]
pub fn count_inconsistent(parts_metadata: &[FileInfo], set_width: usize) -> usize {
    let mut inconsistent = 0;
    for (i, meta) in parts_metadata.iter().enumerate() {
        if !meta.is_valid() || meta.deleted {
            continue;
        }
        if meta.erasure.distribution.len() != set_width
            || meta.erasure.distribution.get(i) != Some(&meta.erasure.index)
        {
            inconsistent += 1;
        }
    }
    inconsistent
}

/// Whether distribution arrays can be trusted for this object
///
/// A single decision for the whole call, not per slot.
#[must_use]
pub fn erasure_distribution_reliable(parts_metadata: &[FileInfo], set_width: usize) -> bool {
    let inconsistent = count_inconsistent(parts_metadata, set_width);
    let reliable = inconsistent <= parts_metadata.len() / 2;
    if !reliable {
        warn!(
            inconsistent,
            total = parts_metadata.len(),
            "erasure distribution is unreliable, skipping distribution checks"
        );
    }
    reliable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_info::ErasureInfo;

    fn record(index: usize, distribution: Vec<usize>) -> FileInfo {
        FileInfo {
            erasure: ErasureInfo {
                data_blocks: 2,
                parity_blocks: 2,
                block_size: 1024,
                index,
                distribution,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_set_is_reliable() {
        let metas: Vec<FileInfo> = (1..=4).map(|i| record(i, vec![1, 2, 3, 4])).collect();
        assert_eq!(count_inconsistent(&metas, 4), 0);
        assert!(erasure_distribution_reliable(&metas, 4));
    }

    #[test]
    fn test_half_inconsistent_is_still_reliable() {
        let metas = vec![
            record(1, vec![1, 2, 3, 4]),
            record(2, vec![1, 2, 3, 4]),
            record(4, vec![1, 2, 3, 4]),
            record(3, vec![1, 2, 3, 4]),
        ];
        assert_eq!(count_inconsistent(&metas, 4), 2);
        assert!(erasure_distribution_reliable(&metas, 4));
    }

    #[test]
    fn test_majority_inconsistent_is_unreliable() {
        let metas = vec![
            record(2, vec![1, 2, 3, 4]),
            record(1, vec![1, 2, 3, 4]),
            record(4, vec![1, 2, 3, 4]),
            record(4, vec![1, 2, 3, 4]),
        ];
        assert_eq!(count_inconsistent(&metas, 4), 3);
        assert!(!erasure_distribution_reliable(&metas, 4));
    }

    #[test]
    fn test_width_mismatch_counts_as_inconsistent() {
        let metas: Vec<FileInfo> = (1..=4).map(|i| record(i, vec![1, 2, 3, 4])).collect();
        assert_eq!(count_inconsistent(&metas, 6), 4);
    }

    #[test]
    fn test_invalid_and_deleted_records_are_ignored() {
        let mut deleted = record(3, vec![1, 2, 3, 4]);
        deleted.deleted = true;
        let metas = vec![
            FileInfo::default(),
            record(1, vec![1, 2, 3, 4]),
            deleted,
            FileInfo::default(),
        ];
        assert_eq!(count_inconsistent(&metas, 4), 1);
        assert!(erasure_distribution_reliable(&metas, 4));
    }

    #[test]
    fn test_more_records_than_set_width() {
        // the extra slot has no distribution entry of its own
        let mut metas: Vec<FileInfo> = (1..=4).map(|i| record(i, vec![1, 2, 3, 4])).collect();
        metas.push(record(1, vec![1, 2, 3, 4]));
        assert_eq!(count_inconsistent(&metas, 4), 1);
        assert!(erasure_distribution_reliable(&metas, 4));
    }
}
