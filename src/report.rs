//! Report building and serialization over a completed analysis.
//!
//! This is the external surface of the analyzer: everything here is derived
//! from aggregator state and the finalized records, so a report can be built
//! either from a live pass or by re-folding a raw record export.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyzer::pipeline::Analysis;
use crate::analyzer::stats::{late_count, LatencyStats};
use crate::analyzer::types::{seconds_between, Gap, LedgerRecord, OverThresholdEntry};

/// Combined validation summary across every observed validator.
#[derive(Debug, Serialize)]
pub struct ValidationSummary {
    pub validators_total: usize,
    pub validations_total: usize,
    pub validations_missed: usize,
    pub validations_late: usize,
    pub validations_mean: Option<f64>,
    pub validations_median: Option<f64>,
    pub validations_stdev: Option<f64>,
}

/// Per-validator validation summary.
#[derive(Debug, Serialize)]
pub struct ValidatorReport {
    pub master_key: String,
    pub validations_total: usize,
    pub validations_missed: usize,
    pub validations_late: usize,
    pub validations_mean: Option<f64>,
    pub validations_median: Option<f64>,
    pub validations_stdev: Option<f64>,
}

/// Top-level analysis report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<String>,
    pub duration_seconds: f64,
    /// Count of finalized ledgers.
    pub ledgers: usize,
    /// Total number of ledgers skipped across all gaps.
    pub gaps_total: u64,
    pub gaps: Vec<Gap>,
    pub over_threshold_total: usize,
    pub over_threshold: Vec<OverThresholdEntry>,
    pub ledger_time: LatencyStats,
    pub validations: ValidationSummary,
    pub validators: Vec<ValidatorReport>,
}

impl Report {
    /// Build the report from a completed analysis.
    pub fn build(analysis: &Analysis) -> Self {
        let stats = &analysis.stats;
        let ledgers = stats.ledgers();

        let duration_seconds = match (stats.first_timestamp(), stats.last_timestamp()) {
            (Some(first), Some(last)) => seconds_between(last, first),
            _ => 0.0,
        };

        let mut all_samples: Vec<f64> = Vec::new();
        let mut missed_total = 0;
        let mut late_total = 0;
        let mut validators = Vec::with_capacity(stats.validators().len());
        for (master_key, samples) in stats.validators() {
            let missed = ledgers.saturating_sub(samples.len());
            let late = late_count(samples);
            missed_total += missed;
            late_total += late;
            all_samples.extend_from_slice(samples);

            let latency = LatencyStats::from_samples(samples);
            validators.push(ValidatorReport {
                master_key: master_key.clone(),
                validations_total: samples.len(),
                validations_missed: missed,
                validations_late: late,
                validations_mean: latency.mean,
                validations_median: latency.median,
                validations_stdev: latency.stdev,
            });
        }

        let combined = LatencyStats::from_samples(&all_samples);
        let validations = ValidationSummary {
            validators_total: stats.validators().len(),
            validations_total: all_samples.len(),
            validations_missed: missed_total,
            validations_late: late_total,
            validations_mean: combined.mean,
            validations_median: combined.median,
            validations_stdev: combined.stdev,
        };

        Self {
            start_date: stats.first_timestamp(),
            end_date: stats.last_timestamp(),
            duration: (ledgers > 0).then(|| format_duration(duration_seconds)),
            duration_seconds,
            ledgers,
            gaps_total: analysis.gaps_total,
            gaps: analysis.gaps.clone(),
            over_threshold_total: stats.over_threshold().len(),
            over_threshold: stats.over_threshold().to_vec(),
            ledger_time: LatencyStats::from_samples(stats.ledger_times()),
            validations,
            validators,
        }
    }

    /// Re-derive the report from a raw record export.
    ///
    /// Runs the same fold as the live pass and therefore reproduces its
    /// numbers exactly.
    pub fn from_records(records: Vec<LedgerRecord>, threshold: f64) -> Self {
        Self::build(&Analysis::from_records(records, threshold))
    }
}

/// Format whole seconds as `H:MM:SS`.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
