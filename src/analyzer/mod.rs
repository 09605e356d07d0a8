//! Log-event extraction and cross-event correlation for consensus node logs.
//!
//! Provides functionality for:
//! - Classifying raw log lines into typed ledger events
//! - Tracking each ledger from build through consensus to finalization
//! - Correlating trusted validator validations, including out-of-order arrivals
//! - Detecting sequence gaps and folding latency statistics
//!
//! Processing is a strict single pass in file order; the whole pipeline is a
//! fold from the input line sequence into a final [`Analysis`].

pub mod log_loader;
pub mod log_parser;
pub mod pipeline;
pub mod stats;
pub mod tracker;
pub mod types;

pub use log_loader::LogLoader;
pub use pipeline::{Analysis, Pipeline};
pub use types::{Gap, LedgerRecord, LogEvent, OverThresholdEntry};
