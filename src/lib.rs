//! Batch analyzer for rippled consensus node logs.
//!
//! Reconstructs, per ledger, the timeline of local block construction, local
//! consensus advancement and receipt of trusted validator validations, then
//! derives latency and health statistics from that reconstruction.

pub mod analyzer;
pub mod report;
