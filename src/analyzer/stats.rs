//! Gap detection and latency statistics over finalized ledgers.
//!
//! Both pieces are plain folds: every finalized record is observed exactly
//! once, samples accumulate in full, and summary statistics are computed a
//! single time over the complete sample sets rather than incrementally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::BTreeMap;

use super::types::{Gap, LedgerRecord, OverThresholdEntry};

/// Detects discontinuities in the finalized ledger sequence.
#[derive(Debug, Default)]
pub struct GapDetector {
    last_seq: Option<u32>,
    gaps: Vec<Gap>,
    skipped: u64,
}

impl GapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a finalized record against the expected next sequence.
    pub fn observe(&mut self, record: &LedgerRecord) {
        if let Some(last) = self.last_seq {
            if record.seq <= last {
                // Out-of-order finalization must not corrupt the gap tally
                log::debug!("Ignoring non-monotonic finalized sequence {} after {}", record.seq, last);
                return;
            }
            if record.seq > last + 1 {
                let gap = Gap {
                    start: last + 1,
                    end: record.seq - 1,
                    timestamp: record.timestamp,
                };
                self.skipped += gap.skipped();
                self.gaps.push(gap);
            }
        }
        self.last_seq = Some(record.seq);
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Total number of ledgers skipped across all gaps.
    pub fn skipped_total(&self) -> u64 {
        self.skipped
    }

    pub fn into_gaps(self) -> Vec<Gap> {
        self.gaps
    }
}

/// Running per-network and per-validator sample accumulation.
#[derive(Debug)]
pub struct StatsAggregator {
    threshold: f64,
    ledgers: usize,
    first_timestamp: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    ledger_times: Vec<f64>,
    over_threshold: Vec<OverThresholdEntry>,
    validations: BTreeMap<String, Vec<f64>>,
}

impl StatsAggregator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ledgers: 0,
            first_timestamp: None,
            last_timestamp: None,
            ledger_times: Vec::new(),
            over_threshold: Vec::new(),
            validations: BTreeMap::new(),
        }
    }

    /// Fold one finalized record into the running distributions.
    pub fn record(&mut self, record: &LedgerRecord) {
        self.ledgers += 1;
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(record.timestamp);
        }
        self.last_timestamp = Some(record.timestamp);

        if let Some(latency) = record.latency {
            self.ledger_times.push(latency);
            if latency > self.threshold {
                self.over_threshold.push(OverThresholdEntry {
                    seq: record.seq,
                    duration: latency,
                    timestamp: record.timestamp,
                });
            }
        }

        for (master_key, latency) in &record.validations {
            // A null entry still teaches us the validator exists
            let samples = self.validations.entry(master_key.clone()).or_default();
            if let Some(latency) = latency {
                samples.push(*latency);
            }
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Count of finalized ledgers folded in so far.
    pub fn ledgers(&self) -> usize {
        self.ledgers
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.first_timestamp
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Close latencies of all ledgers after the first, in finalization order.
    pub fn ledger_times(&self) -> &[f64] {
        &self.ledger_times
    }

    pub fn over_threshold(&self) -> &[OverThresholdEntry] {
        &self.over_threshold
    }

    /// Latency samples per validator master key, sorted by key.
    pub fn validators(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.validations
    }
}

/// Summary statistics over one latency sample set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub stdev: Option<f64>,
}

impl LatencyStats {
    /// Compute mean, median and sample standard deviation.
    ///
    /// Mean and median need at least one sample, the standard deviation
    /// (Bessel-corrected) at least two; short sample sets report null.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self {
                mean: None,
                median: None,
                stdev: None,
            };
        }
        let mut data = Data::new(samples.to_vec());
        Self {
            mean: Some(samples.iter().mean()),
            median: Some(data.median()),
            stdev: (samples.len() > 1).then(|| samples.iter().std_dev()),
        }
    }
}

/// Validations that arrived after the local consensus advance.
pub fn late_count(samples: &[f64]) -> usize {
    samples.iter().filter(|latency| **latency < 0.0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 6, 22, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn record(seq: u32, secs: i64, latency: Option<f64>) -> LedgerRecord {
        LedgerRecord {
            seq,
            hash: format!("H{}", seq),
            timestamp: ts(secs),
            latency,
            built_latency: None,
            validations: BTreeMap::new(),
            peer_validations: BTreeMap::new(),
        }
    }

    #[test]
    fn test_consecutive_sequences_have_no_gaps() {
        let mut detector = GapDetector::new();
        for seq in 100..110 {
            detector.observe(&record(seq, i64::from(seq), None));
        }
        assert!(detector.gaps().is_empty());
        assert_eq!(detector.skipped_total(), 0);
    }

    #[test]
    fn test_missing_range_produces_one_gap() {
        let mut detector = GapDetector::new();
        detector.observe(&record(8033, 0, None));
        detector.observe(&record(8037, 12, None));

        assert_eq!(detector.gaps().len(), 1);
        let gap = &detector.gaps()[0];
        assert_eq!((gap.start, gap.end), (8034, 8036));
        assert_eq!(gap.timestamp, ts(12));
        assert_eq!(detector.skipped_total(), 3);
    }

    #[test]
    fn test_non_monotonic_record_does_not_corrupt_tally() {
        let mut detector = GapDetector::new();
        detector.observe(&record(100, 0, None));
        detector.observe(&record(100, 1, None));
        detector.observe(&record(99, 2, None));
        detector.observe(&record(101, 3, None));

        assert!(detector.gaps().is_empty());
        assert_eq!(detector.skipped_total(), 0);
    }

    #[test]
    fn test_over_threshold_is_strictly_greater() {
        let mut aggregator = StatsAggregator::new(5.0);
        aggregator.record(&record(1, 0, None));
        aggregator.record(&record(2, 4, Some(4.0)));
        aggregator.record(&record(3, 9, Some(5.0)));

        // A close time of exactly the threshold is not reported
        assert!(aggregator.over_threshold().is_empty());

        aggregator.record(&record(4, 16, Some(7.0)));
        assert_eq!(aggregator.over_threshold().len(), 1);
        assert_eq!(aggregator.over_threshold()[0].seq, 4);
        assert_eq!(aggregator.over_threshold()[0].duration, 7.0);
    }

    #[test]
    fn test_validator_samples_accumulate() {
        let mut aggregator = StatsAggregator::new(10.0);
        let mut first = record(1, 0, None);
        first.validations.insert("nHBv1".to_string(), Some(0.5));
        first.validations.insert("nHBv2".to_string(), Some(-0.25));
        let mut second = record(2, 4, Some(4.0));
        second.validations.insert("nHBv1".to_string(), Some(0.75));
        second.validations.insert("nHBv3".to_string(), None);

        aggregator.record(&first);
        aggregator.record(&second);

        assert_eq!(aggregator.validators()["nHBv1"], vec![0.5, 0.75]);
        assert_eq!(aggregator.validators()["nHBv2"], vec![-0.25]);
        // An explicit null entry registers the validator with no samples
        assert!(aggregator.validators()["nHBv3"].is_empty());
    }

    #[test]
    fn test_latency_stats_known_samples() {
        let stats = LatencyStats::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.median, Some(2.5));
        let stdev = stats.stdev.unwrap();
        assert!((stdev - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_latency_stats_degenerate_sets() {
        let empty = LatencyStats::from_samples(&[]);
        assert_eq!(empty, LatencyStats { mean: None, median: None, stdev: None });

        let single = LatencyStats::from_samples(&[3.5]);
        assert_eq!(single.mean, Some(3.5));
        assert_eq!(single.median, Some(3.5));
        assert_eq!(single.stdev, None);
    }

    #[test]
    fn test_late_count_is_strictly_negative() {
        assert_eq!(late_count(&[0.5, 0.0, -0.001, -2.0]), 2);
    }
}
