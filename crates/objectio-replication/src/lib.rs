//! ObjectIO Replication - bucket replication statistics
//!
//! Tracks pending, failed, completed and replica bytes and operation counts
//! per bucket and remote target, along with a rolling last-minute upload
//! latency histogram. Updates go through [`ReplicationStats`]; readers get
//! immutable [`BucketReplicationStats`] snapshots that can be merged across
//! nodes.

pub mod cache;
pub mod latency;
pub mod stats;

pub use cache::{ReplicationStats, ReplicationStatus, StatDelta};
pub use latency::{AccElem, LastMinuteLatencies, LastMinuteLatency, ReplicationLatency, SizeTag};
pub use stats::{BucketReplicationStat, BucketReplicationStats};
