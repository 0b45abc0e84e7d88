//! Immutable replication statistics snapshots

use crate::latency::ReplicationLatency;
use serde::Serialize;
use std::collections::BTreeMap;

/// Replication counters for one bucket and remote target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketReplicationStat {
    #[serde(rename = "pendingReplicationSize")]
    pub pending_size: i64,
    #[serde(rename = "completedReplicationSize")]
    pub replicated_size: i64,
    #[serde(rename = "replicaSize")]
    pub replica_size: i64,
    #[serde(rename = "failedReplicationSize")]
    pub failed_size: i64,
    /// Pending operations, metadata updates included
    #[serde(rename = "pendingReplicationCount")]
    pub pending_count: i64,
    /// Failed operations, metadata updates included
    #[serde(rename = "failedReplicationCount")]
    pub failed_count: i64,
    #[serde(rename = "replicationLatency")]
    pub latency: ReplicationLatency,
}

impl BucketReplicationStat {
    /// Whether any counter is non-zero
    #[must_use]
    pub const fn has_replication_usage(&self) -> bool {
        self.failed_size > 0
            || self.replicated_size > 0
            || self.replica_size > 0
            || self.failed_count > 0
            || self.pending_count > 0
            || self.pending_size > 0
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            pending_size: self.pending_size + other.pending_size,
            replicated_size: self.replicated_size + other.replicated_size,
            replica_size: self.replica_size + other.replica_size,
            failed_size: self.failed_size + other.failed_size,
            pending_count: self.pending_count + other.pending_count,
            failed_count: self.failed_count + other.failed_count,
            latency: self.latency.merge(&other.latency),
        }
    }
}

/// Replication counters for one bucket, per target plus bucket totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BucketReplicationStats {
    /// Per-target counters keyed by target ARN
    #[serde(rename = "Stats")]
    pub stats: BTreeMap<String, BucketReplicationStat>,
    #[serde(rename = "pendingReplicationSize")]
    pub pending_size: i64,
    #[serde(rename = "completedReplicationSize")]
    pub replicated_size: i64,
    #[serde(rename = "replicaSize")]
    pub replica_size: i64,
    #[serde(rename = "failedReplicationSize")]
    pub failed_size: i64,
    #[serde(rename = "pendingReplicationCount")]
    pub pending_count: i64,
    #[serde(rename = "failedReplicationCount")]
    pub failed_count: i64,
}

impl BucketReplicationStats {
    /// No target has stats and no replica bytes were received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.replica_size == 0
    }

    /// Sum two snapshots, e.g. from different nodes
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut stats = self.stats.clone();
        for (arn, st) in &other.stats {
            stats
                .entry(arn.clone())
                .and_modify(|s| *s = s.merge(st))
                .or_insert_with(|| st.clone());
        }
        Self {
            stats,
            pending_size: self.pending_size + other.pending_size,
            replicated_size: self.replicated_size + other.replicated_size,
            replica_size: self.replica_size + other.replica_size,
            failed_size: self.failed_size + other.failed_size,
            pending_count: self.pending_count + other.pending_count,
            failed_count: self.failed_count + other.failed_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(pending: i64, replicated: i64) -> BucketReplicationStat {
        BucketReplicationStat {
            pending_size: pending,
            replicated_size: replicated,
            pending_count: i64::from(pending > 0),
            ..Default::default()
        }
    }

    #[test]
    fn test_replication_usage() {
        assert!(!BucketReplicationStat::default().has_replication_usage());
        assert!(stat(0, 10).has_replication_usage());
        let failed = BucketReplicationStat {
            failed_count: 1,
            ..Default::default()
        };
        assert!(failed.has_replication_usage());
    }

    #[test]
    fn test_empty() {
        let mut s = BucketReplicationStats::default();
        assert!(s.is_empty());
        s.replica_size = 5;
        assert!(!s.is_empty());
        s.replica_size = 0;
        s.stats.insert("arn:a".into(), BucketReplicationStat::default());
        assert!(!s.is_empty());
    }

    #[test]
    fn test_merge_combines_targets_and_totals() {
        let a = BucketReplicationStats {
            stats: BTreeMap::from([("arn:a".to_string(), stat(10, 0))]),
            pending_size: 10,
            pending_count: 1,
            ..Default::default()
        };
        let b = BucketReplicationStats {
            stats: BTreeMap::from([
                ("arn:a".to_string(), stat(5, 20)),
                ("arn:b".to_string(), stat(0, 7)),
            ]),
            pending_size: 5,
            replicated_size: 27,
            pending_count: 1,
            ..Default::default()
        };

        let m = a.merge(&b);
        assert_eq!(m.stats.len(), 2);
        assert_eq!(m.stats["arn:a"].pending_size, 15);
        assert_eq!(m.stats["arn:a"].replicated_size, 20);
        assert_eq!(m.stats["arn:b"].replicated_size, 7);
        assert_eq!(m.pending_size, 15);
        assert_eq!(m.pending_count, 2);
        assert_eq!(m.replicated_size, 27);
        // clones are independent
        assert_eq!(a.stats["arn:a"].pending_size, 10);
    }

    #[test]
    fn test_json_field_names() {
        let s = BucketReplicationStats {
            stats: BTreeMap::from([("arn:a".to_string(), stat(3, 4))]),
            replica_size: 9,
            ..Default::default()
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["replicaSize"], 9);
        assert_eq!(json["Stats"]["arn:a"]["pendingReplicationSize"], 3);
        assert_eq!(json["Stats"]["arn:a"]["completedReplicationSize"], 4);
        assert!(json["Stats"]["arn:a"]["replicationLatency"]["uploadHistogram"].is_object());
    }
}
