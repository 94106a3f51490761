//! Join budget derived from the retry settings.

use std::time::Duration;

/// Wall-clock ceiling for waiting on one write result.
///
/// Each attempt of a retried write costs at most `timeout` plus its backoff,
/// and the backoff grows by `retry_timeout` per attempt. Treating the
/// per-attempt costs as an arithmetic series:
///
/// ```text
/// first  = timeout + retry_timeout
/// last   = first + (max_retries - 1) * retry_timeout
/// budget = (first + last) * max_retries / 2
/// ```
///
/// This is a heuristic upper bound, not a proven one; use
/// [`TimeoutBudget::fixed`] when measured latencies call for something else.
/// It is not a per-attempt timeout: that one belongs to the backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget(Duration);

impl TimeoutBudget {
    pub fn compute(timeout: Duration, retry_timeout: Duration, max_retries: u32) -> Self {
        let attempts = max_retries.max(1);
        let first = timeout.saturating_add(retry_timeout);
        let last = first.saturating_add(retry_timeout.saturating_mul(attempts - 1));
        Self(first.saturating_add(last).saturating_mul(attempts) / 2)
    }

    pub fn fixed(budget: Duration) -> Self {
        Self(budget)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl From<TimeoutBudget> for Duration {
    fn from(budget: TimeoutBudget) -> Self {
        budget.0
    }
}
