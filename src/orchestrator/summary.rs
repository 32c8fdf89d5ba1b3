use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::http_probe::prelude::TargetTally;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every worker finished all of its attempts.
    Completed,
    /// The run deadline or the idle timeout fired first. Counts are partial.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub success: u64,
    pub failure: u64,
    pub status: RunStatus,
    /// Per-target counts in input order.
    pub targets: Vec<TargetTally>,
}

impl RunSummary {
    pub(crate) fn from_tallies(
        started_at: DateTime<Utc>,
        elapsed: Duration,
        status: RunStatus,
        targets: Vec<TargetTally>,
    ) -> Self {
        let (success, failure) = targets
            .iter()
            .fold((0, 0), |(s, f), t| (s + t.success, f + t.failure));
        Self {
            started_at,
            elapsed,
            success,
            failure,
            status,
            targets,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.status == RunStatus::TimedOut
    }

    pub fn attempts(&self) -> u64 {
        self.success + self.failure
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "success: {}, failure: {}, elapsed: {:.3?}",
            self.success, self.failure, self.elapsed
        )?;
        if self.is_partial() {
            write!(f, " (timed out, partial)")?;
        }
        Ok(())
    }
}
