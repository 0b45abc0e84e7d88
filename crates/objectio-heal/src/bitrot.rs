//! Bitrot verification of shard data
//!
//! Works on any [`Read`] source so the same check runs against inline data
//! held in a metadata record and against shard files on disk.

use objectio_common::{BitrotAlgorithm, DiskError, bitrot_shard_file_size};
use std::io::Read;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Verify a shard stream against its recorded checksum
///
/// * `want_size` - number of bytes available in `reader`
/// * `part_size` - shard data size expected for the part (without digests)
/// * `want` - whole-file digest, used only by non-streaming algorithms
/// * `shard_size` - block size between interleaved digests
pub fn bitrot_verify<R: Read>(
    reader: &mut R,
    want_size: u64,
    part_size: u64,
    algorithm: BitrotAlgorithm,
    want: &[u8],
    shard_size: u64,
) -> Result<(), DiskError> {
    if !algorithm.is_streaming() {
        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut read_total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            read_total += n as u64;
        }
        if read_total != want_size {
            return Err(DiskError::FileCorrupt);
        }
        let got = hasher.finalize();
        if got != want {
            return Err(DiskError::BitrotHashMismatch {
                expected: hex::encode(want),
                actual: hex::encode(got),
            });
        }
        return Ok(());
    }

    let expected_file_size = bitrot_shard_file_size(part_size, shard_size, algorithm);
    if want_size != expected_file_size {
        return Err(DiskError::FileSizeMismatch {
            expected: expected_file_size,
            actual: want_size,
        });
    }

    if shard_size == 0 && want_size > 0 {
        return Err(DiskError::FileCorrupt);
    }

    // shard_size comes from metadata, so blocks are hashed through a fixed
    // buffer rather than one allocation per block
    let mut digest = vec![0u8; algorithm.digest_len()];
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut left = want_size;
    while left > 0 {
        reader.read_exact(&mut digest).map_err(|_| DiskError::FileCorrupt)?;
        left = left.saturating_sub(digest.len() as u64);

        let this_block = shard_size.min(left);
        let mut hasher = algorithm.hasher();
        let mut remaining = this_block;
        while remaining > 0 {
            let n = usize::try_from(remaining).map_or(READ_BUF_SIZE, |r| r.min(READ_BUF_SIZE));
            reader
                .read_exact(&mut buf[..n])
                .map_err(|_| DiskError::FileCorrupt)?;
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }
        left -= this_block;

        let got = hasher.finalize();
        if got != digest {
            return Err(DiskError::BitrotHashMismatch {
                expected: hex::encode(&digest),
                actual: hex::encode(got),
            });
        }
    }
    Ok(())
}
