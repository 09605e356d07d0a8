//! Ledger lifecycle tracking and validation correlation.
//!
//! Each ledger sequence number moves through three stages as log events
//! arrive: build observed (timestamp parked by sequence), consensus reached
//! (record held in a bounded in-flight window so trailing validations can
//! still attach), finalized (record emitted once, immutable afterwards).
//! Validations that arrive before their ledger's consensus advance are
//! buffered by hash and drained when the record is created.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::types::{seconds_between, LedgerRecord, LogEvent};

/// Number of consensus-reached ledgers kept in flight for late validations.
const RETENTION_WINDOW: usize = 4;

/// Maximum distinct ledger hashes buffered while awaiting local consensus.
const PENDING_HASH_LIMIT: usize = 64;

/// A trusted validation waiting for its ledger hash to reach local consensus.
#[derive(Debug, Clone)]
struct PendingValidation {
    master_key: String,
    timestamp: DateTime<Utc>,
    from_peer: bool,
}

/// Tracks in-flight ledgers and attaches validations to them.
#[derive(Debug)]
pub struct LedgerTracker {
    /// Build timestamps parked until the matching consensus advance.
    builds: HashMap<u32, DateTime<Utc>>,
    /// Consensus-reached records, oldest first; len never exceeds
    /// RETENTION_WINDOW between events.
    window: VecDeque<LedgerRecord>,
    /// Validations that arrived before their ledger hash was known.
    pending: HashMap<String, Vec<PendingValidation>>,
    /// Insertion order of pending hashes, for capacity eviction.
    pending_order: VecDeque<String>,
    /// Consensus timestamp of the most recently accepted ledger.
    last_timestamp: Option<DateTime<Utc>>,
    /// Highest sequence number accepted so far; guards against regressions.
    highest_seq: Option<u32>,
    /// Validations discarded because their hash never matched a ledger.
    discarded_validations: u64,
}

impl LedgerTracker {
    pub fn new() -> Self {
        Self {
            builds: HashMap::new(),
            window: VecDeque::with_capacity(RETENTION_WINDOW + 1),
            pending: HashMap::new(),
            pending_order: VecDeque::new(),
            last_timestamp: None,
            highest_seq: None,
            discarded_validations: 0,
        }
    }

    /// Apply one classified event.
    ///
    /// Returns a record when the in-flight window overflowed and its oldest
    /// ledger finalized; the caller must push that record through the
    /// downstream fold exactly once.
    pub fn apply(&mut self, timestamp: DateTime<Utc>, event: LogEvent) -> Option<LedgerRecord> {
        match event {
            LogEvent::BuildObserved { seq } => {
                // Duplicate build messages are possible; the first timestamp wins
                self.builds.entry(seq).or_insert(timestamp);
                None
            }
            LogEvent::ConsensusAdvanced { seq, hash } => self.advance(seq, hash, timestamp),
            LogEvent::ValidationReceived {
                master_key,
                ledger_hash,
                from_peer,
            } => {
                self.correlate(master_key, ledger_hash, timestamp, from_peer);
                None
            }
        }
    }

    /// Drain the retention window at end of input, in consensus order.
    ///
    /// Validations still buffered at this point can never resolve and are
    /// discarded.
    pub fn finish(&mut self) -> Vec<LedgerRecord> {
        for buffered in self.pending.values() {
            self.discarded_validations += buffered.len() as u64;
        }
        self.pending.clear();
        self.pending_order.clear();
        self.builds.clear();
        self.window.drain(..).collect()
    }

    /// Validations whose ledger hash never resolved within the window.
    pub fn discarded_validations(&self) -> u64 {
        self.discarded_validations
    }

    fn advance(&mut self, seq: u32, hash: String, timestamp: DateTime<Utc>) -> Option<LedgerRecord> {
        if let Some(highest) = self.highest_seq {
            // The source guarantees monotonic sequences; a regression here is
            // a log anomaly and must not corrupt the in-flight state
            if seq <= highest {
                log::debug!("Ignoring consensus advance to {} at or below {}", seq, highest);
                return None;
            }
        }

        let built_latency = self
            .builds
            .remove(&seq)
            .map(|built| seconds_between(timestamp, built));
        let latency = self.last_timestamp.map(|prev| seconds_between(timestamp, prev));

        let mut record = LedgerRecord {
            seq,
            hash,
            timestamp,
            latency,
            built_latency,
            validations: BTreeMap::new(),
            peer_validations: BTreeMap::new(),
        };
        self.drain_pending_into(&mut record);

        self.last_timestamp = Some(timestamp);
        self.highest_seq = Some(seq);
        self.window.push_back(record);

        if self.window.len() > RETENTION_WINDOW {
            let finalized = self.window.pop_front();
            if let Some(finalized) = &finalized {
                // Build timestamps at or below the finalized sequence can no
                // longer pair with an advance
                self.builds.retain(|&seq, _| seq > finalized.seq);
            }
            return finalized;
        }
        None
    }

    fn correlate(
        &mut self,
        master_key: String,
        ledger_hash: String,
        timestamp: DateTime<Utc>,
        from_peer: bool,
    ) {
        // Recent ledgers are the most likely match, search the window backwards
        if let Some(record) = self.window.iter_mut().rev().find(|r| r.hash == ledger_hash) {
            attach_validation(record, master_key, timestamp, from_peer);
            return;
        }

        // Ledger not known yet: buffer until its consensus advance arrives
        if !self.pending.contains_key(&ledger_hash) {
            while self.pending_order.len() >= PENDING_HASH_LIMIT {
                if let Some(evicted) = self.pending_order.pop_front() {
                    if let Some(dropped) = self.pending.remove(&evicted) {
                        self.discarded_validations += dropped.len() as u64;
                        log::debug!(
                            "Discarding {} buffered validations for unresolved ledger hash {}",
                            dropped.len(),
                            evicted
                        );
                    }
                }
            }
            self.pending_order.push_back(ledger_hash.clone());
        }
        self.pending.entry(ledger_hash).or_default().push(PendingValidation {
            master_key,
            timestamp,
            from_peer,
        });
    }

    fn drain_pending_into(&mut self, record: &mut LedgerRecord) {
        if let Some(buffered) = self.pending.remove(&record.hash) {
            self.pending_order.retain(|hash| hash != &record.hash);
            for validation in buffered {
                attach_validation(record, validation.master_key, validation.timestamp, validation.from_peer);
            }
        }
    }
}

impl Default for LedgerTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach one validation to a record with its signed latency.
///
/// Positive latency means the validation arrived before the local consensus
/// advance.
fn attach_validation(
    record: &mut LedgerRecord,
    master_key: String,
    timestamp: DateTime<Utc>,
    from_peer: bool,
) {
    let latency = seconds_between(record.timestamp, timestamp);
    record.peer_validations.insert(master_key.clone(), from_peer);
    record.validations.insert(master_key, Some(latency));
}
