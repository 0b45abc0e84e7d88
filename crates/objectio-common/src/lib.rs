//! ObjectIO Common - Shared types and utilities
//!
//! This crate provides the error taxonomy, bitrot checksum algorithms,
//! scan-mode and drive-state types, and configuration used by the healing
//! and replication-statistics crates.

pub mod checksum;
pub mod config;
pub mod error;
pub mod types;

pub use checksum::{BitrotAlgorithm, BitrotHasher, bitrot_shard_file_size};
pub use config::{Config, HealConfig, LoggingConfig};
pub use error::{DiskError, Error, ErrorClass, Result};
pub use types::{DriveState, HealScanMode};
