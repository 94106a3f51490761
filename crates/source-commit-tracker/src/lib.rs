//! # Source commit tracker
//!
//! Reads records from a partitioned log and hands them downstream as
//! [`relay_core::Entry`] values. Offsets are committed only when the
//! consumer acknowledges an entry key, so anything not acknowledged before a
//! restart is delivered again.
//!
//! ```text
//! LogReader::fetch ──▶ extractor ──▶ CommitTracker::on_deliver ──▶ output channel
//!                                                                      │
//!        LogReader::commit ◀── CommitTracker::take ◀── commit_entry(keys)
//! ```

mod config;
mod reader;
mod source;
mod tracker;

pub use config::{SourceConfig, StartOffset};
pub use reader::{FetchError, LogReader, LogRecord};
pub use source::{record_entry, value_entry, LogSource, RecordExtractor};
pub use tracker::CommitTracker;
