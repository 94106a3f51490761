//! # Retriable write coordinator
//!
//! Fan-out/fan-in engine shared by the entry-relay sinks.
//!
//! ```text
//! entries ──▶ [group by key?] ──▶ one task per entry / per group
//!                                      │  EntryWriter::write (via RetryPolicy)
//!                                      ▼
//!                               mpsc<Outcome>  ──▶ bounded join ──▶ reconcile ──▶ BatchError
//! ```
//!
//! - [`RetryPolicy`]: bounded attempts with linear backoff; returns the last error.
//! - [`TimeoutBudget`]: the ceiling that bounds every join, derived from the
//!   retry settings so a legitimately retried write is not cut off.
//! - [`WriteCoordinator`]: dispatches writes concurrently and accounts for
//!   every submitted key exactly once, including keys whose writer never
//!   reports back.

mod budget;
mod coordinator;
mod retry;

pub use budget::TimeoutBudget;
pub use coordinator::{CoordinatorConfig, EntryWriter, JoinMode, WriteCoordinator};
pub use retry::RetryPolicy;
