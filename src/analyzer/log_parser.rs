//! Parse individual log lines and extract structured `LogEvent` data.
//!
//! Supports the following log line formats:
//! - *Built*: Local ledger build completed (`LedgerConsensus` at debug)
//! - *Advancing*: Local consensus advanced to a ledger (`LedgerMaster` at info)
//! - *Validation*: Trusted validator validation received (`NetworkOPs` at debug)
//!
//! This is a best-effort extractor over a free-text log, not a strict-grammar
//! parser: lines from unrelated components, at other severities, or with
//! malformed fields simply yield no event.

use super::types::LogEvent;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a log line and extract timestamp and event.
///
/// # Parameters
///
/// * `line` - A single log line to parse
///
/// # Returns
///
/// `Some((timestamp, event))` if parsing succeeds, `None` for unparseable
/// lines. For validation lines the returned timestamp is the arrival time of
/// the validation at the local node.
///
/// # Log Line Formats
///
/// ```text
/// Built (local ledger build completed):
/// 2023-Jan-06 22:52:24.407176011 UTC LedgerConsensus:DBG Built ledger #8033: 4C6108A6C78B926B9425B31AD34B9EA573B9EBE0C0EE426954103A8F1B1B0DCF
///
/// Advancing (local consensus advanced):
/// 2023-Jan-06 22:52:25.132000000 UTC LedgerMaster:NFO Advancing accepted ledger to 8033 with hash 4C6108A6C78B926B9425B31AD34B9EA573B9EBE0C0EE426954103A8F1B1B0DCF
///
/// Validation (trusted validator validation received):
/// 2023-Jan-06 22:52:24.901239019 UTC NetworkOPs:DBG VALIDATION: validation:  ledger_hash: 4C6108A6... consensus_hash: 05C97963... sign_time: 2023-Jan-06 22:52:24 UTC seen_time: 2023-Jan-06 22:52:24 UTC signer_public_key: n9KQ2... node_id: n9KQ2... is_valid: 1 is_full: 1 is_trusted: 1 from_peer: 1 signing_hash: 7C3B65... base58: n9KQ2... master_key: nHB1X5...
/// ```
pub fn parse_log_line(line: &str) -> Option<(DateTime<Utc>, LogEvent)> {
    // Extract timestamp from the start of the line
    let timestamp = parse_timestamp(line)?;

    // Determine event type and parse accordingly
    if line.contains("LedgerConsensus:DBG Built ledger #") {
        parse_built(line).map(|event| (timestamp, event))
    } else if line.contains("LedgerMaster:NFO Advancing accepted ledger to") {
        parse_advancing(line).map(|event| (timestamp, event))
    } else if line.contains("NetworkOPs:DBG VALIDATION: validation:") {
        parse_validation(line).map(|event| (timestamp, event))
    } else {
        None
    }
}

/// Extract timestamp from the beginning of a log line.
fn parse_timestamp(line: &str) -> Option<DateTime<Utc>> {
    // Timestamp format: 2023-Jan-06 22:52:24.407176011 UTC
    let end = line.find(" UTC ")?;
    NaiveDateTime::parse_from_str(&line[..end], "%Y-%b-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Parse a *Built* line - local ledger build completed.
fn parse_built(line: &str) -> Option<LogEvent> {
    let seq = extract_field_u32(line, "Built ledger #")?;

    Some(LogEvent::BuildObserved { seq })
}

/// Parse an *Advancing* line - local consensus advanced to a ledger.
fn parse_advancing(line: &str) -> Option<LogEvent> {
    let seq = extract_field_u32(line, "Advancing accepted ledger to")?;
    let hash = extract_field(line, "with hash")?;

    Some(LogEvent::ConsensusAdvanced { seq, hash })
}

/// Parse a *Validation* line - validation received from a validator.
///
/// Only trusted validations produce an event; untrusted ones are dropped.
fn parse_validation(line: &str) -> Option<LogEvent> {
    if !extract_field_flag(line, "is_trusted:")? {
        return None;
    }
    let ledger_hash = extract_field(line, "ledger_hash:")?;
    let master_key = extract_field(line, "master_key:")?;
    let from_peer = extract_field_flag(line, "from_peer:").unwrap_or(false);

    Some(LogEvent::ValidationReceived {
        master_key,
        ledger_hash,
        from_peer,
    })
}

/// Extract a u32 field value following a marker.
fn extract_field_u32(line: &str, marker: &str) -> Option<u32> {
    let pos = line.find(marker)?;
    let remaining = line[pos + marker.len()..].trim_start();

    // Find the end of the number (first non-digit character)
    let end = remaining
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(remaining.len());

    remaining[..end].parse().ok()
}

/// Extract a whitespace-delimited token following a marker.
fn extract_field(line: &str, marker: &str) -> Option<String> {
    let pos = line.find(marker)?;
    let remaining = line[pos + marker.len()..].trim_start();

    let end = remaining
        .find(|c: char| c.is_whitespace())
        .unwrap_or(remaining.len());

    if end == 0 {
        return None;
    }
    Some(remaining[..end].to_string())
}

/// Extract a 0/1 flag field following a marker.
fn extract_field_flag(line: &str, marker: &str) -> Option<bool> {
    match extract_field(line, marker)?.as_str() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
