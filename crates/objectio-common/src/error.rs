//! Error types for ObjectIO healing
//!
//! Two levels of error are used by the reconciliation engine:
//! - [`DiskError`] describes the outcome of one disk slot. Slot errors never
//!   abort a pass; they are collected and returned one per slot.
//! - [`Error`] fails a whole call, e.g. when no version has read quorum.

use thiserror::Error;

/// Common result type for ObjectIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of an operation against a single disk slot
///
/// `Eq + Hash` so that identical outcomes from different disks can be
/// counted against each other during quorum reduction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DiskError {
    #[error("disk not found")]
    DiskNotFound,

    #[error("disk is faulty")]
    FaultyDisk,

    #[error("disk access denied")]
    DiskAccessDenied,

    #[error("disk is not formatted")]
    UnformattedDisk,

    #[error("volume not found")]
    VolumeNotFound,

    #[error("file not found")]
    FileNotFound,

    #[error("file version not found")]
    FileVersionNotFound,

    #[error("file is corrupted")]
    FileCorrupt,

    #[error("file size mismatch: expected {expected} bytes, got {actual} bytes")]
    FileSizeMismatch { expected: u64, actual: u64 },

    #[error("bitrot hash mismatch: expected {expected}, got {actual}")]
    BitrotHashMismatch { expected: String, actual: String },

    #[error("disk operation timed out")]
    Timeout,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("disk I/O error: {0}")]
    Io(String),
}

/// Coarse classification of a slot error, used by healers to pick a repair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The disk could not be contacted; re-fetch later
    Unreachable,
    /// Metadata or shard is absent on an otherwise healthy disk
    Missing,
    /// Metadata present but inconsistent with the chosen version
    StructuralCorruption,
    /// Checksum or size verification failed against the metadata
    IntegrityMismatch,
    /// Anything else (I/O failures and the like)
    Other,
}

impl DiskError {
    /// Errors that do not count towards (or against) read quorum for
    /// object operations.
    #[must_use]
    pub fn is_object_op_ignored(&self) -> bool {
        matches!(
            self,
            Self::DiskNotFound
                | Self::FaultyDisk
                | Self::DiskAccessDenied
                | Self::UnformattedDisk
                | Self::Timeout
        )
    }

    /// Classify the error for repair decisions
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DiskNotFound | Self::FaultyDisk | Self::Timeout => ErrorClass::Unreachable,
            Self::FileNotFound | Self::FileVersionNotFound | Self::VolumeNotFound => {
                ErrorClass::Missing
            }
            Self::FileCorrupt => ErrorClass::StructuralCorruption,
            Self::FileSizeMismatch { .. } | Self::BitrotHashMismatch { .. } => {
                ErrorClass::IntegrityMismatch
            }
            Self::DiskAccessDenied
            | Self::UnformattedDisk
            | Self::InvalidArgument(_)
            | Self::Io(_) => ErrorClass::Other,
        }
    }
}

impl From<std::io::Error> for DiskError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound,
            std::io::ErrorKind::PermissionDenied => Self::DiskAccessDenied,
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Common error type for ObjectIO healing
#[derive(Debug, Error)]
pub enum Error {
    #[error("read quorum not met for object")]
    ErasureReadQuorum,

    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// A read quorum failure may clear up once offline disks come back, so
    /// the healer is expected to try again on a later pass.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ErasureReadQuorum => true,
            Self::Disk(e) => e.class() == ErrorClass::Unreachable,
            _ => false,
        }
    }
}
