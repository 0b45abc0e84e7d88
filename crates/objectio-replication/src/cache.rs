//! Live replication counters
//!
//! Counters are plain atomics so concurrent updates from different objects
//! only contend on the map lock when a bucket or target is first seen.
//! Readers get immutable [`BucketReplicationStats`] snapshots.

use crate::latency::ReplicationLatency;
use crate::stats::{BucketReplicationStat, BucketReplicationStats};
use derive_more::Display;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Replication status of an object version towards one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplicationStatus {
    #[display("PENDING")]
    Pending,
    #[display("COMPLETED")]
    Completed,
    #[display("FAILED")]
    Failed,
    /// Received from a source bucket
    #[display("REPLICA")]
    Replica,
}

/// Raw counter change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatDelta {
    pub pending_size: i64,
    pub replicated_size: i64,
    pub replica_size: i64,
    pub failed_size: i64,
    pub pending_count: i64,
    pub failed_count: i64,
}

impl StatDelta {
    /// Counter change for a status transition of an object of `size` bytes
    #[must_use]
    pub fn for_transition(
        size: i64,
        status: ReplicationStatus,
        prev_status: Option<ReplicationStatus>,
    ) -> Self {
        let mut d = Self::default();
        match status {
            ReplicationStatus::Pending => {
                if prev_status != Some(ReplicationStatus::Pending) {
                    d.pending_size += size;
                    d.pending_count += 1;
                }
            }
            ReplicationStatus::Completed => {
                match prev_status {
                    Some(ReplicationStatus::Pending) => {
                        d.pending_size -= size;
                        d.pending_count -= 1;
                    }
                    Some(ReplicationStatus::Failed) => {
                        d.failed_size -= size;
                        d.failed_count -= 1;
                    }
                    _ => {}
                }
                d.replicated_size += size;
            }
            ReplicationStatus::Failed => {
                if prev_status == Some(ReplicationStatus::Pending) {
                    d.pending_size -= size;
                    d.pending_count -= 1;
                }
                d.failed_size += size;
                d.failed_count += 1;
            }
            ReplicationStatus::Replica => {
                d.replica_size += size;
            }
        }
        d
    }
}

#[derive(Debug, Default)]
struct Counters {
    pending_size: AtomicI64,
    replicated_size: AtomicI64,
    replica_size: AtomicI64,
    failed_size: AtomicI64,
    pending_count: AtomicI64,
    failed_count: AtomicI64,
}

impl Counters {
    fn apply(&self, d: &StatDelta) {
        self.pending_size.fetch_add(d.pending_size, Ordering::Relaxed);
        self.replicated_size
            .fetch_add(d.replicated_size, Ordering::Relaxed);
        self.replica_size.fetch_add(d.replica_size, Ordering::Relaxed);
        self.failed_size.fetch_add(d.failed_size, Ordering::Relaxed);
        self.pending_count.fetch_add(d.pending_count, Ordering::Relaxed);
        self.failed_count.fetch_add(d.failed_count, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct TargetCounters {
    counters: Counters,
    latency: Mutex<ReplicationLatency>,
}

impl TargetCounters {
    fn snapshot(&self) -> BucketReplicationStat {
        let c = &self.counters;
        BucketReplicationStat {
            pending_size: c.pending_size.load(Ordering::Relaxed),
            replicated_size: c.replicated_size.load(Ordering::Relaxed),
            replica_size: c.replica_size.load(Ordering::Relaxed),
            failed_size: c.failed_size.load(Ordering::Relaxed),
            pending_count: c.pending_count.load(Ordering::Relaxed),
            failed_count: c.failed_count.load(Ordering::Relaxed),
            latency: self.latency.lock().clone(),
        }
    }
}

#[derive(Debug, Default)]
struct BucketCounters {
    totals: Counters,
    targets: RwLock<HashMap<String, Arc<TargetCounters>>>,
}

impl BucketCounters {
    fn target(&self, arn: &str) -> Arc<TargetCounters> {
        if let Some(t) = self.targets.read().get(arn) {
            return t.clone();
        }
        self.targets
            .write()
            .entry(arn.to_string())
            .or_default()
            .clone()
    }

    fn snapshot(&self) -> BucketReplicationStats {
        let stats = self
            .targets
            .read()
            .iter()
            .map(|(arn, t)| (arn.clone(), t.snapshot()))
            .collect();
        let c = &self.totals;
        BucketReplicationStats {
            stats,
            pending_size: c.pending_size.load(Ordering::Relaxed),
            replicated_size: c.replicated_size.load(Ordering::Relaxed),
            replica_size: c.replica_size.load(Ordering::Relaxed),
            failed_size: c.failed_size.load(Ordering::Relaxed),
            pending_count: c.pending_count.load(Ordering::Relaxed),
            failed_count: c.failed_count.load(Ordering::Relaxed),
        }
    }
}

/// In-memory replication statistics for all buckets
#[derive(Debug, Default)]
pub struct ReplicationStats {
    buckets: RwLock<HashMap<String, Arc<BucketCounters>>>,
}

impl ReplicationStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket: &str) -> Arc<BucketCounters> {
        if let Some(b) = self.buckets.read().get(bucket) {
            return b.clone();
        }
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .clone()
    }

    /// Record a replication status change for one object version
    ///
    /// Replica bytes are tracked on the bucket totals only. Completed
    /// transitions also feed the target's upload latency.
    pub fn update(
        &self,
        bucket: &str,
        target: &str,
        size: i64,
        duration: Duration,
        status: ReplicationStatus,
        prev_status: Option<ReplicationStatus>,
    ) {
        let delta = StatDelta::for_transition(size, status, prev_status);
        trace!(bucket, target, size, %status, ?prev_status, "replication status update");

        let b = self.bucket(bucket);
        b.totals.apply(&delta);
        if status == ReplicationStatus::Replica {
            return;
        }
        let t = b.target(target);
        t.counters.apply(&delta);
        if status == ReplicationStatus::Completed {
            t.latency
                .lock()
                .update(u64::try_from(size).unwrap_or(0), duration);
        }
    }

    /// Apply a raw counter change to a target and its bucket totals
    pub fn apply_delta(&self, bucket: &str, target: &str, delta: &StatDelta) {
        let b = self.bucket(bucket);
        b.totals.apply(delta);
        b.target(target).counters.apply(delta);
    }

    /// Drop all counters for a bucket
    pub fn delete(&self, bucket: &str) {
        self.buckets.write().remove(bucket);
    }

    /// Copy of one bucket's counters
    #[must_use]
    pub fn snapshot(&self, bucket: &str) -> Option<BucketReplicationStats> {
        let b = self.buckets.read().get(bucket).cloned()?;
        Some(b.snapshot())
    }

    /// Copy of every bucket's counters
    #[must_use]
    pub fn snapshot_all(&self) -> BTreeMap<String, BucketReplicationStats> {
        let buckets: Vec<(String, Arc<BucketCounters>)> = self
            .buckets
            .read()
            .iter()
            .map(|(name, b)| (name.clone(), b.clone()))
            .collect();
        buckets
            .into_iter()
            .map(|(name, b)| (name, b.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ReplicationStatus::{Completed, Failed, Pending, Replica};

    const ARN: &str = "arn:objectio:replication::site-b:photos";

    #[test]
    fn test_pending_then_completed() {
        let stats = ReplicationStats::new();
        stats.update("photos", ARN, 100, Duration::ZERO, Pending, None);
        let s = stats.snapshot("photos").unwrap();
        assert_eq!(s.pending_size, 100);
        assert_eq!(s.pending_count, 1);
        assert_eq!(s.stats[ARN].pending_size, 100);

        stats.update("photos", ARN, 100, Duration::from_millis(20), Completed, Some(Pending));
        let s = stats.snapshot("photos").unwrap();
        assert_eq!(s.pending_size, 0);
        assert_eq!(s.pending_count, 0);
        assert_eq!(s.replicated_size, 100);
        assert_eq!(s.stats[ARN].replicated_size, 100);
        assert_eq!(s.stats[ARN].latency.upload_latency()["LESS_THAN_1_KiB"], 20);
    }

    #[test]
    fn test_repeated_pending_counts_once() {
        let stats = ReplicationStats::new();
        stats.update("photos", ARN, 50, Duration::ZERO, Pending, None);
        stats.update("photos", ARN, 50, Duration::ZERO, Pending, Some(Pending));
        let s = stats.snapshot("photos").unwrap();
        assert_eq!(s.pending_size, 50);
        assert_eq!(s.pending_count, 1);
    }

    #[test]
    fn test_failed_then_retried() {
        let stats = ReplicationStats::new();
        stats.update("photos", ARN, 10, Duration::ZERO, Pending, None);
        stats.update("photos", ARN, 10, Duration::ZERO, Failed, Some(Pending));
        let s = stats.snapshot("photos").unwrap();
        assert_eq!((s.pending_size, s.pending_count), (0, 0));
        assert_eq!((s.failed_size, s.failed_count), (10, 1));

        stats.update("photos", ARN, 10, Duration::ZERO, Completed, Some(Failed));
        let s = stats.snapshot("photos").unwrap();
        assert_eq!((s.failed_size, s.failed_count), (0, 0));
        assert_eq!(s.replicated_size, 10);
    }

    #[test]
    fn test_replica_is_bucket_level() {
        let stats = ReplicationStats::new();
        stats.update("photos", ARN, 42, Duration::ZERO, Replica, None);
        let s = stats.snapshot("photos").unwrap();
        assert_eq!(s.replica_size, 42);
        assert!(s.stats.is_empty());
        assert!(!s.is_empty());
    }

    #[test]
    fn test_apply_delta_and_snapshot_isolation() {
        let stats = ReplicationStats::new();
        let delta = StatDelta {
            failed_size: 7,
            failed_count: 1,
            ..Default::default()
        };
        stats.apply_delta("photos", ARN, &delta);
        let before = stats.snapshot("photos").unwrap();
        stats.apply_delta("photos", ARN, &delta);

        assert_eq!(before.failed_size, 7);
        assert_eq!(stats.snapshot("photos").unwrap().failed_size, 14);
        assert!(before.stats[ARN].has_replication_usage());
    }

    #[test]
    fn test_snapshot_all_and_delete() {
        let stats = ReplicationStats::new();
        stats.update("a", ARN, 1, Duration::ZERO, Pending, None);
        stats.update("b", ARN, 2, Duration::ZERO, Pending, None);
        let all = stats.snapshot_all();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        stats.delete("a");
        assert!(stats.snapshot("a").is_none());
        assert_eq!(stats.snapshot_all().len(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(ReplicationStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.update("photos", ARN, 1, Duration::ZERO, Pending, None);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = stats.snapshot("photos").unwrap();
        assert_eq!(s.pending_count, 8000);
        assert_eq!(s.stats[ARN].pending_size, 8000);
    }
}
