//! Core type definitions for ObjectIO healing

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How thoroughly a healing pass verifies shard data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum HealScanMode {
    /// Structural check: every part file is present and large enough
    #[default]
    #[display("normal")]
    Normal,
    /// Full bitrot verification of every shard block
    #[display("deep")]
    Deep,
}

impl FromStr for HealScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "deep" => Ok(Self::Deep),
            other => Err(format!("unknown scan mode: {other}")),
        }
    }
}

/// State of one erasure-set member for a given object version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DriveState {
    /// Holds the latest version with all data verified
    #[display("ok")]
    Ok,
    /// Disk could not be contacted
    #[display("offline")]
    Offline,
    /// Metadata or parts are absent
    #[display("missing")]
    Missing,
    /// Metadata or shard data failed verification
    #[display("corrupt")]
    Corrupt,
    /// Reachable but holds an older version or no usable copy
    #[display("outdated")]
    Outdated,
}

impl DriveState {
    /// Whether a drive in this state must be rewritten by the healer
    #[must_use]
    pub const fn needs_heal(&self) -> bool {
        matches!(self, Self::Missing | Self::Corrupt | Self::Outdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_parse() {
        assert_eq!("deep".parse::<HealScanMode>(), Ok(HealScanMode::Deep));
        assert_eq!("Normal".parse::<HealScanMode>(), Ok(HealScanMode::Normal));
        assert!("quick".parse::<HealScanMode>().is_err());
        assert_eq!(HealScanMode::default(), HealScanMode::Normal);
    }

    #[test]
    fn test_drive_state_needs_heal() {
        assert!(!DriveState::Ok.needs_heal());
        assert!(!DriveState::Offline.needs_heal());
        assert!(DriveState::Corrupt.needs_heal());
        assert!(DriveState::Outdated.needs_heal());
    }
}
