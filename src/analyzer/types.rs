//! Type definitions specific to the analyzer module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed log line variants.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// `LedgerConsensus` - the local node finished building a ledger.
    BuildObserved { seq: u32 },
    /// `LedgerMaster` - the local node advanced consensus to a ledger.
    ConsensusAdvanced { seq: u32, hash: String },
    /// `NetworkOPs` - a trusted validator's validation arrived.
    ValidationReceived {
        master_key: String,
        ledger_hash: String,
        from_peer: bool,
    },
}

/// One finalized ledger as reconstructed from the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub seq: u32,
    pub hash: String,
    /// When the local node reached consensus on this ledger.
    pub timestamp: DateTime<Utc>,
    /// Seconds since the previous ledger's consensus timestamp.
    /// Absent for the first ledger of the run.
    pub latency: Option<f64>,
    /// Seconds between local build completion and the consensus advance.
    /// Absent for ledgers acquired without a local build.
    pub built_latency: Option<f64>,
    /// Validator master key -> signed validation latency in seconds.
    /// Positive means the validation arrived before the local consensus
    /// advance; a null entry means the validation was never received.
    pub validations: BTreeMap<String, Option<f64>>,
    /// Validator master key -> whether the validation came directly from a
    /// peer connection.
    pub peer_validations: BTreeMap<String, bool>,
}

/// A run of ledger sequence numbers the node skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// First skipped sequence number (inclusive).
    pub start: u32,
    /// Last skipped sequence number (inclusive).
    pub end: u32,
    /// Consensus timestamp of the ledger that resumed after the gap.
    pub timestamp: DateTime<Utc>,
}

impl Gap {
    /// Number of ledgers this gap skipped.
    pub fn skipped(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }
}

/// A ledger whose close time exceeded the configured threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverThresholdEntry {
    pub seq: u32,
    /// The close latency that exceeded the threshold, in seconds.
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

/// Signed difference `later - earlier` in seconds.
pub fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    let delta = later.signed_duration_since(earlier);
    delta
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_milliseconds() as f64 / 1000.0)
}
