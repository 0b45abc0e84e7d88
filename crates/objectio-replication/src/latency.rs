//! Rolling last-minute latency accumulators
//!
//! A [`LastMinuteLatency`] keeps one accumulator per wall-clock second for
//! the last 60 seconds. Seconds that scroll out of the window are zeroed
//! lazily, the next time the window is touched.
//!
//! [`LastMinuteLatencies`] keeps one window per object size range.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

const WINDOW_SECS: usize = 60;

/// Accumulated latency samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccElem {
    /// Sum of sample durations in nanoseconds
    pub total: u64,
    /// Number of samples
    pub n: u64,
}

impl AccElem {
    fn add(&mut self, d: Duration) {
        self.total = self
            .total
            .saturating_add(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        self.n += 1;
    }

    fn merge(&mut self, other: &Self) {
        self.total = self.total.saturating_add(other.total);
        self.n += other.n;
    }

    /// Average sample in nanoseconds, 0 when empty
    #[must_use]
    pub const fn avg(&self) -> u64 {
        if self.n == 0 {
            return 0;
        }
        self.total / self.n
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn slot(sec: i64) -> usize {
    // rem_euclid keeps the index in 0..60 for any timestamp
    usize::try_from(sec.rem_euclid(WINDOW_SECS as i64)).unwrap_or(0)
}

/// One-second accumulators for the last minute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastMinuteLatency {
    totals: [AccElem; WINDOW_SECS],
    last_sec: i64,
}

impl Default for LastMinuteLatency {
    fn default() -> Self {
        Self {
            totals: [AccElem::default(); WINDOW_SECS],
            last_sec: 0,
        }
    }
}

impl LastMinuteLatency {
    /// Record a sample at the current time
    pub fn add(&mut self, d: Duration) {
        self.add_at(now_secs(), d);
    }

    /// Record a sample at `sec` (unix seconds)
    pub fn add_at(&mut self, sec: i64, d: Duration) {
        self.forward_to(sec);
        self.totals[slot(sec)].add(d);
    }

    /// Sum of all samples in the window ending now
    #[must_use]
    pub fn total(&self) -> AccElem {
        self.total_at(now_secs())
    }

    /// Sum of all samples in the window ending at `sec`
    #[must_use]
    pub fn total_at(&self, sec: i64) -> AccElem {
        let mut window = self.clone();
        window.forward_to(sec);
        let mut acc = AccElem::default();
        for elem in &window.totals {
            acc.merge(elem);
        }
        acc
    }

    /// Combine two windows, aligned to the later of the two
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut a = self.clone();
        let mut b = other.clone();
        let sec = a.last_sec.max(b.last_sec);
        a.forward_to(sec);
        b.forward_to(sec);
        for (x, y) in a.totals.iter_mut().zip(&b.totals) {
            x.merge(y);
        }
        a
    }

    fn forward_to(&mut self, sec: i64) {
        if self.last_sec >= sec {
            return;
        }
        if sec - self.last_sec >= WINDOW_SECS as i64 {
            self.totals = [AccElem::default(); WINDOW_SECS];
        } else {
            for s in self.last_sec + 1..=sec {
                self.totals[slot(s)] = AccElem::default();
            }
        }
        self.last_sec = sec;
    }
}

/// Object size range used to bucket latency samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeTag {
    LessThan1KiB,
    Between1KiBAnd1MiB,
    Between1MiBAnd10MiB,
    Between10MiBAnd64MiB,
    Between64MiBAnd128MiB,
    GreaterThan128MiB,
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

impl SizeTag {
    pub const ALL: [Self; 6] = [
        Self::LessThan1KiB,
        Self::Between1KiBAnd1MiB,
        Self::Between1MiBAnd10MiB,
        Self::Between10MiBAnd64MiB,
        Self::Between64MiBAnd128MiB,
        Self::GreaterThan128MiB,
    ];

    /// Range an object of `size` bytes falls in
    #[must_use]
    pub const fn for_size(size: u64) -> Self {
        if size < KIB {
            Self::LessThan1KiB
        } else if size < MIB {
            Self::Between1KiBAnd1MiB
        } else if size < 10 * MIB {
            Self::Between1MiBAnd10MiB
        } else if size < 64 * MIB {
            Self::Between10MiBAnd64MiB
        } else if size < 128 * MIB {
            Self::Between64MiBAnd128MiB
        } else {
            Self::GreaterThan128MiB
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan1KiB => "LESS_THAN_1_KiB",
            Self::Between1KiBAnd1MiB => "BETWEEN_1_KiB_AND_1_MiB",
            Self::Between1MiBAnd10MiB => "BETWEEN_1_MiB_AND_10_MiB",
            Self::Between10MiBAnd64MiB => "BETWEEN_10_MiB_AND_64_MiB",
            Self::Between64MiBAnd128MiB => "BETWEEN_64_MiB_AND_128_MiB",
            Self::GreaterThan128MiB => "GREATER_THAN_128_MiB",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One last-minute window per object size range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastMinuteLatencies {
    histogram: [LastMinuteLatency; 6],
}

impl LastMinuteLatencies {
    pub fn add(&mut self, size: u64, d: Duration) {
        self.histogram[SizeTag::for_size(size).index()].add(d);
    }

    pub fn add_at(&mut self, sec: i64, size: u64, d: Duration) {
        self.histogram[SizeTag::for_size(size).index()].add_at(sec, d);
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = Self::default();
        for tag in SizeTag::ALL {
            let i = tag.index();
            merged.histogram[i] = self.histogram[i].merge(&other.histogram[i]);
        }
        merged
    }

    /// Window totals per size range, ending now
    #[must_use]
    pub fn totals(&self) -> [(SizeTag, AccElem); 6] {
        self.totals_at(now_secs())
    }

    /// Window totals per size range, ending at `sec`
    #[must_use]
    pub fn totals_at(&self, sec: i64) -> [(SizeTag, AccElem); 6] {
        SizeTag::ALL.map(|tag| (tag, self.histogram[tag.index()].total_at(sec)))
    }
}

/// Latency of replication operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationLatency {
    /// Single and multipart PUT latency
    pub upload_histogram: LastMinuteLatencies,
}

impl ReplicationLatency {
    /// Record an upload of `size` bytes that took `d`
    pub fn update(&mut self, size: u64, d: Duration) {
        self.upload_histogram.add(size, d);
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            upload_histogram: self.upload_histogram.merge(&other.upload_histogram),
        }
    }

    /// Average upload latency in milliseconds, keyed by size range
    #[must_use]
    pub fn upload_latency(&self) -> BTreeMap<String, u64> {
        Self::to_millis(self.upload_histogram.totals())
    }

    /// Like [`Self::upload_latency`], for the window ending at `sec`
    #[must_use]
    pub fn upload_latency_at(&self, sec: i64) -> BTreeMap<String, u64> {
        Self::to_millis(self.upload_histogram.totals_at(sec))
    }

    fn to_millis(totals: [(SizeTag, AccElem); 6]) -> BTreeMap<String, u64> {
        totals
            .into_iter()
            .map(|(tag, acc)| (tag.as_str().to_string(), acc.avg() / 1_000_000))
            .collect()
    }
}

/// Reported as the per-size-range average upload latency in milliseconds
impl Serialize for ReplicationLatency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut wrapper = BTreeMap::new();
        wrapper.insert("uploadHistogram", self.upload_latency());
        wrapper.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    #[test]
    fn test_window_sums_recent_samples() {
        let mut w = LastMinuteLatency::default();
        w.add_at(T0, Duration::from_millis(10));
        w.add_at(T0 + 1, Duration::from_millis(30));
        let total = w.total_at(T0 + 1);
        assert_eq!(total.n, 2);
        assert_eq!(total.avg(), Duration::from_millis(20).as_nanos() as u64);
    }

    #[test]
    fn test_old_samples_fall_out() {
        let mut w = LastMinuteLatency::default();
        w.add_at(T0, Duration::from_millis(10));
        w.add_at(T0 + 30, Duration::from_millis(10));
        assert_eq!(w.total_at(T0 + 59).n, 2);
        assert_eq!(w.total_at(T0 + 60).n, 1);
        assert_eq!(w.total_at(T0 + 200).n, 0);
        // reading does not move the window
        assert_eq!(w.total_at(T0 + 30).n, 2);
    }

    #[test]
    fn test_merge_aligns_to_later_window() {
        let mut a = LastMinuteLatency::default();
        a.add_at(T0, Duration::from_millis(5));
        let mut b = LastMinuteLatency::default();
        b.add_at(T0 + 70, Duration::from_millis(7));

        let merged = a.merge(&b);
        let total = merged.total_at(T0 + 70);
        assert_eq!(total.n, 1);
        assert_eq!(total.total, Duration::from_millis(7).as_nanos() as u64);
    }

    #[test]
    fn test_size_tags() {
        assert_eq!(SizeTag::for_size(0), SizeTag::LessThan1KiB);
        assert_eq!(SizeTag::for_size(1024), SizeTag::Between1KiBAnd1MiB);
        assert_eq!(SizeTag::for_size(5 * MIB), SizeTag::Between1MiBAnd10MiB);
        assert_eq!(SizeTag::for_size(64 * MIB), SizeTag::Between64MiBAnd128MiB);
        assert_eq!(SizeTag::for_size(1 << 40), SizeTag::GreaterThan128MiB);
    }

    #[test]
    fn test_upload_latency_in_millis() {
        let mut rl = ReplicationLatency::default();
        rl.upload_histogram.add_at(T0, 100, Duration::from_millis(4));
        rl.upload_histogram.add_at(T0, 200, Duration::from_millis(8));
        rl.upload_histogram.add_at(T0, 2 * MIB, Duration::from_millis(50));

        let avg = rl.upload_latency_at(T0);
        assert_eq!(avg.len(), 6);
        assert_eq!(avg["LESS_THAN_1_KiB"], 6);
        assert_eq!(avg["BETWEEN_1_MiB_AND_10_MiB"], 50);
        assert_eq!(avg["GREATER_THAN_128_MiB"], 0);
    }

    #[test]
    fn test_merge_sums_size_ranges() {
        let mut a = ReplicationLatency::default();
        a.upload_histogram.add_at(T0, 10, Duration::from_millis(2));
        let mut b = ReplicationLatency::default();
        b.upload_histogram.add_at(T0, 10, Duration::from_millis(4));

        let merged = a.merge(&b);
        assert_eq!(merged.upload_latency_at(T0)["LESS_THAN_1_KiB"], 3);
        // inputs are untouched
        assert_eq!(a.upload_latency_at(T0)["LESS_THAN_1_KiB"], 2);
    }
}
