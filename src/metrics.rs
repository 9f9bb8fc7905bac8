//! Per-transaction-type latency and outcome accounting.
//!
//! Each worker owns a private [`TxnMetrics`] and records into it without
//! any synchronization; the driver merges the per-worker recorders once
//! after the stop flag settles. Six channels: one per transaction type
//! plus an aggregate every sample also lands in. Latencies are whole
//! milliseconds in an HDR histogram; the report additionally folds them
//! into the fixed geometric-ish bucket boundaries OLTP dashboards expect.

use crate::transactions::TxnType;
use hdrhistogram::Histogram;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Report bucket upper bounds, in milliseconds. Roughly geometric from
/// 1ms to 100s, denser where interactive latencies live.
pub const LATENCY_BUCKET_BOUNDS_MS: [u64; 34] = [
    1, 2, 3, 4, 5, 6, 8, 10, 13, 16, 20, 25, 30, 40, 50, 65, 80, 100, 130, 160, 200, 250, 300,
    400, 500, 650, 800, 1000, 2000, 5000, 10_000, 20_000, 50_000, 100_000,
];

const MAX_TRACKED_MS: u64 = 100_000;

/// One latency/outcome channel: committed and rolled-back runs share the
/// histogram, failures are counted only.
struct Channel {
    hist: Histogram<u64>,
    committed: u64,
    rolled_back: u64,
    failed: u64,
}

impl Channel {
    fn new() -> Self {
        Self {
            hist: Histogram::<u64>::new_with_bounds(1, MAX_TRACKED_MS, 3).unwrap(),
            committed: 0,
            rolled_back: 0,
            failed: 0,
        }
    }

    fn merge(&mut self, other: &Channel) {
        let _ = self.hist.add(&other.hist);
        self.committed += other.committed;
        self.rolled_back += other.rolled_back;
        self.failed += other.failed;
    }

    fn summarize(&self, name: &'static str, secs: f64) -> ChannelSummary {
        let samples = self.committed + self.rolled_back;
        ChannelSummary {
            name,
            committed: self.committed,
            rolled_back: self.rolled_back,
            failed: self.failed,
            throughput: if secs > 0.0 {
                samples as f64 / secs
            } else {
                0.0
            },
            mean_ms: self.hist.mean(),
            p50_ms: self.hist.value_at_percentile(50.0),
            p95_ms: self.hist.value_at_percentile(95.0),
            p99_ms: self.hist.value_at_percentile(99.0),
            max_ms: self.hist.max(),
            buckets: bucket_counts(&self.hist),
        }
    }
}

/// A single worker's recorder. Not shared; merge after the run.
pub struct TxnMetrics {
    per_type: Vec<Channel>,
    aggregate: Channel,
}

impl TxnMetrics {
    pub fn new() -> Self {
        Self {
            per_type: (0..TxnType::COUNT).map(|_| Channel::new()).collect(),
            aggregate: Channel::new(),
        }
    }

    #[inline(always)]
    pub fn start(&self) -> Instant {
        Instant::now()
    }

    /// Record a committed run; designed rollbacks go through
    /// [`Self::record_rollback`] but still contribute a latency sample.
    pub fn record_commit(&mut self, kind: TxnType, elapsed: Duration) {
        let ms = (elapsed.as_millis() as u64).max(1);
        let channel = &mut self.per_type[kind.index()];
        channel.hist.saturating_record(ms);
        channel.committed += 1;
        self.aggregate.hist.saturating_record(ms);
        self.aggregate.committed += 1;
    }

    pub fn record_rollback(&mut self, kind: TxnType, elapsed: Duration) {
        let ms = (elapsed.as_millis() as u64).max(1);
        let channel = &mut self.per_type[kind.index()];
        channel.hist.saturating_record(ms);
        channel.rolled_back += 1;
        self.aggregate.hist.saturating_record(ms);
        self.aggregate.rolled_back += 1;
    }

    /// Collaborator error; no latency sample, the iteration is discarded.
    pub fn record_failure(&mut self, kind: TxnType) {
        self.per_type[kind.index()].failed += 1;
        self.aggregate.failed += 1;
    }

    pub fn merge(&mut self, other: &TxnMetrics) {
        for (mine, theirs) in self.per_type.iter_mut().zip(&other.per_type) {
            mine.merge(theirs);
        }
        self.aggregate.merge(&other.aggregate);
    }

    /// Folds the run into the six channel summaries.
    pub fn summarize(&self, elapsed: Duration) -> MetricsSummary {
        let secs = elapsed.as_secs_f64();
        MetricsSummary {
            elapsed_secs: secs,
            per_type: TxnType::ALL
                .iter()
                .map(|&kind| self.per_type[kind.index()].summarize(kind.name(), secs))
                .collect(),
            aggregate: self.aggregate.summarize("aggregate", secs),
        }
    }
}

impl Default for TxnMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample counts per fixed report bucket; entry `i` covers
/// `(bounds[i-1], bounds[i]]` ms.
///
/// Bins by a single pass over the recorded values rather than repeated
/// range counts: at high magnitudes an hdrhistogram equivalence bucket
/// can straddle a report bound, and a straddling value must land in
/// exactly one bucket.
fn bucket_counts(hist: &Histogram<u64>) -> Vec<u64> {
    let mut counts = vec![0u64; LATENCY_BUCKET_BOUNDS_MS.len()];
    for entry in hist.iter_recorded() {
        let value = hist.lowest_equivalent(entry.value_iterated_to());
        let idx = LATENCY_BUCKET_BOUNDS_MS
            .partition_point(|&bound| bound < value)
            .min(LATENCY_BUCKET_BOUNDS_MS.len() - 1);
        counts[idx] += entry.count_at_value();
    }
    counts
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub name: &'static str,
    pub committed: u64,
    pub rolled_back: u64,
    pub failed: u64,
    /// Latency samples per second over the whole run.
    pub throughput: f64,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
    pub buckets: Vec<u64>,
}

impl ChannelSummary {
    pub fn samples(&self) -> u64 {
        self.committed + self.rolled_back
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub elapsed_secs: f64,
    pub per_type: Vec<ChannelSummary>,
    pub aggregate: ChannelSummary,
}

impl MetricsSummary {
    pub fn total_samples(&self) -> u64 {
        self.aggregate.samples()
    }

    pub fn total_failed(&self) -> u64 {
        self.aggregate.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_and_rollback_share_the_latency_channel() {
        let mut metrics = TxnMetrics::new();
        metrics.record_commit(TxnType::NewOrder, Duration::from_millis(10));
        metrics.record_rollback(TxnType::NewOrder, Duration::from_millis(30));
        metrics.record_failure(TxnType::NewOrder);

        let summary = metrics.summarize(Duration::from_secs(1));
        let new_order = &summary.per_type[TxnType::NewOrder.index()];
        assert_eq!(new_order.committed, 1);
        assert_eq!(new_order.rolled_back, 1);
        assert_eq!(new_order.failed, 1);
        assert_eq!(new_order.samples(), 2);
        assert_eq!(new_order.max_ms, 30);
    }

    #[test]
    fn every_sample_also_lands_in_the_aggregate_channel() {
        let mut metrics = TxnMetrics::new();
        metrics.record_commit(TxnType::NewOrder, Duration::from_millis(10));
        metrics.record_commit(TxnType::Payment, Duration::from_millis(20));
        metrics.record_rollback(TxnType::NewOrder, Duration::from_millis(40));
        metrics.record_failure(TxnType::Delivery);

        let summary = metrics.summarize(Duration::from_secs(1));
        assert_eq!(summary.aggregate.committed, 2);
        assert_eq!(summary.aggregate.rolled_back, 1);
        assert_eq!(summary.aggregate.failed, 1);
        assert_eq!(summary.aggregate.max_ms, 40);
        assert_eq!(summary.total_samples(), 3);
    }

    #[test]
    fn merge_accumulates_across_workers() {
        let mut a = TxnMetrics::new();
        let mut b = TxnMetrics::new();
        a.record_commit(TxnType::Payment, Duration::from_millis(5));
        b.record_commit(TxnType::Payment, Duration::from_millis(7));
        b.record_failure(TxnType::Delivery);

        a.merge(&b);
        let summary = a.summarize(Duration::from_secs(2));
        assert_eq!(summary.per_type[TxnType::Payment.index()].committed, 2);
        assert_eq!(summary.per_type[TxnType::Delivery.index()].failed, 1);
        assert_eq!(summary.total_samples(), 2);
        assert_eq!(summary.total_failed(), 1);
    }

    #[test]
    fn bucket_counts_cover_every_sample_once() {
        let mut metrics = TxnMetrics::new();
        for ms in [1u64, 2, 9, 100, 99_999] {
            metrics.record_commit(TxnType::StockLevel, Duration::from_millis(ms));
        }
        let summary = metrics.summarize(Duration::from_secs(1));
        let buckets = &summary.per_type[TxnType::StockLevel.index()].buckets;
        assert_eq!(buckets.len(), LATENCY_BUCKET_BOUNDS_MS.len());
        assert_eq!(buckets.iter().sum::<u64>(), 5);
        // 9ms falls in the (8, 10] bucket.
        let idx = LATENCY_BUCKET_BOUNDS_MS
            .iter()
            .position(|&b| b == 10)
            .unwrap();
        assert_eq!(buckets[idx], 1);
    }

    #[test]
    fn samples_on_coarse_bucket_boundaries_count_once() {
        // At these magnitudes the histogram's equivalence buckets are
        // wider than 1ms and can straddle a report bound; each sample
        // must still land in exactly one bucket.
        let mut metrics = TxnMetrics::new();
        for ms in [20_000u64, 50_000, 100_000] {
            metrics.record_commit(TxnType::Payment, Duration::from_millis(ms));
        }
        let summary = metrics.summarize(Duration::from_secs(1));
        let buckets = &summary.per_type[TxnType::Payment.index()].buckets;
        assert_eq!(buckets.iter().sum::<u64>(), 3);
        for bound in [20_000u64, 50_000, 100_000] {
            let idx = LATENCY_BUCKET_BOUNDS_MS
                .iter()
                .position(|&b| b == bound)
                .unwrap();
            assert_eq!(buckets[idx], 1, "bound {bound}");
        }
    }

    #[test]
    fn oversized_latencies_clamp_to_the_top_bucket() {
        let mut metrics = TxnMetrics::new();
        metrics.record_commit(TxnType::OrderStatus, Duration::from_secs(500));
        let summary = metrics.summarize(Duration::from_secs(1));
        let order_status = &summary.per_type[TxnType::OrderStatus.index()];
        assert_eq!(order_status.samples(), 1);
        assert!(order_status.max_ms >= 90_000);
    }
}
