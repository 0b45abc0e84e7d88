//! Majority reduction of per-disk outcomes

use objectio_common::{DiskError, Error};

/// Most common outcome among slots, skipping ignorable errors
///
/// Successes (`None`) are counted like any other outcome and win ties.
/// Among tied errors the one seen first wins.
#[must_use]
pub fn reduce_errs<F>(errs: &[Option<DiskError>], is_ignored: F) -> (usize, Option<DiskError>)
where
    F: Fn(&DiskError) -> bool,
{
    let mut counts: Vec<(Option<&DiskError>, usize)> = Vec::new();
    for err in errs {
        if err.as_ref().is_some_and(&is_ignored) {
            continue;
        }
        let key = err.as_ref();
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }

    let mut max = 0;
    let mut max_err: Option<&DiskError> = None;
    for (err, count) in counts {
        if count > max || (count == max && err.is_none()) {
            max = count;
            max_err = err;
        }
    }
    (max, max_err.cloned())
}

/// Reduce outcomes against a read quorum
///
/// Returns `Ok(())` when successes reach the quorum, the dominant error when
/// an error does, and [`Error::ErasureReadQuorum`] otherwise.
pub fn reduce_read_quorum_errs(errs: &[Option<DiskError>], read_quorum: usize) -> Result<(), Error> {
    let (max_count, max_err) = reduce_errs(errs, DiskError::is_object_op_ignored);
    if max_count >= read_quorum {
        return match max_err {
            None => Ok(()),
            Some(err) => Err(Error::Disk(err)),
        };
    }
    Err(Error::ErasureReadQuorum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_prefers_success_on_tie() {
        let errs = vec![
            None,
            Some(DiskError::FileNotFound),
            None,
            Some(DiskError::FileNotFound),
        ];
        let (count, err) = reduce_errs(&errs, DiskError::is_object_op_ignored);
        assert_eq!(count, 2);
        assert_eq!(err, None);
    }

    #[test]
    fn test_reduce_skips_ignored() {
        let errs = vec![
            Some(DiskError::DiskNotFound),
            Some(DiskError::DiskNotFound),
            Some(DiskError::DiskNotFound),
            Some(DiskError::FileCorrupt),
        ];
        let (count, err) = reduce_errs(&errs, DiskError::is_object_op_ignored);
        assert_eq!(count, 1);
        assert_eq!(err, Some(DiskError::FileCorrupt));
    }

    #[test]
    fn test_read_quorum_met_by_successes() {
        let errs = vec![None, None, Some(DiskError::DiskNotFound), Some(DiskError::FaultyDisk)];
        assert!(reduce_read_quorum_errs(&errs, 2).is_ok());
    }

    #[test]
    fn test_read_quorum_dominant_error() {
        let errs = vec![
            Some(DiskError::FileNotFound),
            Some(DiskError::FileNotFound),
            Some(DiskError::FileNotFound),
            None,
        ];
        assert!(matches!(
            reduce_read_quorum_errs(&errs, 2),
            Err(Error::Disk(DiskError::FileNotFound))
        ));
    }

    #[test]
    fn test_read_quorum_unmet() {
        let errs = vec![
            Some(DiskError::DiskNotFound),
            Some(DiskError::DiskNotFound),
            Some(DiskError::DiskNotFound),
            None,
        ];
        assert!(matches!(
            reduce_read_quorum_errs(&errs, 2),
            Err(Error::ErasureReadQuorum)
        ));
    }
}
