//! Object scan driver
//!
//! Runs one full reconciliation pass for an object across an erasure set:
//! read every disk's metadata, pick the latest version, derive the online
//! set, verify shard data and classify each drive.

use crate::disk::DiskSlot;
use crate::file_info::FileInfo;
use crate::parts::disks_with_all_parts_timeout;
use crate::reconcile::{filter_online_disks_by_format, get_latest_file_info, list_online_disks};
use crate::state::classify_drives;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use objectio_common::{DiskError, DriveState, HealConfig, HealScanMode, Result};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One slot's line in a scan report
#[derive(Clone, Debug, Serialize)]
pub struct DriveReport {
    pub endpoint: Option<String>,
    pub state: DriveState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of scanning one object
#[derive(Clone, Debug, Serialize)]
pub struct ObjectScanReport {
    pub bucket: String,
    pub object: String,
    pub scan_mode: HealScanMode,
    pub mod_time: Option<DateTime<Utc>>,
    pub latest: FileInfo,
    /// Distribution arrays were too inconsistent to be trusted
    pub inconsistent_distribution: bool,
    pub drives: Vec<DriveReport>,
    pub heal_required: bool,
}

impl ObjectScanReport {
    /// Number of drives in the given state
    #[must_use]
    pub fn count(&self, state: DriveState) -> usize {
        self.drives.iter().filter(|d| d.state == state).count()
    }
}

/// Scans objects on a fixed erasure set
pub struct ObjectHealer {
    disks: Vec<DiskSlot>,
    config: HealConfig,
}

impl ObjectHealer {
    pub fn new(disks: Vec<DiskSlot>, config: HealConfig) -> Self {
        Self { disks, config }
    }

    /// Erasure set members, in slot order
    #[must_use]
    pub fn disks(&self) -> &[DiskSlot] {
        &self.disks
    }

    /// Read every disk's metadata record in parallel
    ///
    /// Failed slots get a default record and the error in the same position.
    pub async fn read_all_file_info(
        &self,
        bucket: &str,
        object: &str,
    ) -> (Vec<FileInfo>, Vec<Option<DiskError>>) {
        let timeout = self.config.disk_timeout();
        let results = join_all(self.disks.iter().map(|slot| async move {
            let Some(disk) = slot else {
                return Err(DiskError::DiskNotFound);
            };
            match tokio::time::timeout(timeout, disk.read_version(bucket, object)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(disk = disk.endpoint(), ?timeout, "metadata read timed out");
                    Err(DiskError::Timeout)
                }
            }
        }))
        .await;

        results
            .into_iter()
            .map(|r| match r {
                Ok(fi) => (fi, None),
                Err(err) => (FileInfo::default(), Some(err)),
            })
            .unzip()
    }

    /// Run a full scan of one object with the configured scan mode
    pub async fn scan_object(&self, bucket: &str, object: &str) -> Result<ObjectScanReport> {
        self.scan_object_with_mode(bucket, object, self.config.scan_mode)
            .await
    }

    /// Run a full scan of one object
    pub async fn scan_object_with_mode(
        &self,
        bucket: &str,
        object: &str,
        scan_mode: HealScanMode,
    ) -> Result<ObjectScanReport> {
        let start = Instant::now();
        let (parts_metadata, errs) = self.read_all_file_info(bucket, object).await;

        let latest = get_latest_file_info(&parts_metadata, &errs).inspect_err(|e| {
            warn!(bucket, object, error = %e, "cannot determine latest version");
        })?;

        let (online, mod_time) = list_online_disks(&self.disks, &parts_metadata, &errs);
        let online = filter_online_disks_by_format(&latest, &parts_metadata, &online);
        debug!(
            bucket,
            object,
            online = online.iter().filter(|d| d.is_some()).count(),
            "derived online disks"
        );

        let availability = disks_with_all_parts_timeout(
            &online,
            &parts_metadata,
            &errs,
            &latest,
            bucket,
            object,
            scan_mode,
            self.config.disk_timeout(),
        )
        .await;

        let states = classify_drives(&self.disks, &parts_metadata, &errs, &latest, &availability);
        let drives: Vec<DriveReport> = states
            .iter()
            .enumerate()
            .map(|(i, state)| DriveReport {
                endpoint: self.disks[i].as_ref().map(|d| d.endpoint().to_string()),
                state: *state,
                error: errs[i]
                    .as_ref()
                    .or(availability.data_errs[i].as_ref())
                    .filter(|_| !matches!(state, DriveState::Ok | DriveState::Outdated))
                    .map(ToString::to_string),
            })
            .collect();
        let heal_required = states.iter().any(DriveState::needs_heal);

        let report = ObjectScanReport {
            bucket: bucket.to_string(),
            object: object.to_string(),
            scan_mode,
            mod_time,
            latest,
            inconsistent_distribution: !availability.distribution_reliable,
            drives,
            heal_required,
        };

        info!(
            bucket,
            object,
            %scan_mode,
            ok = report.count(DriveState::Ok),
            offline = report.count(DriveState::Offline),
            heal_required,
            elapsed_ms = duration_ms(start.elapsed()),
            "object scan complete"
        );
        Ok(report)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
