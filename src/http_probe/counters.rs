use std::sync::atomic::{AtomicU64, Ordering};

/// Success and failure counts of a single target.
///
/// Written only by the worker probing the target; readable from anywhere
/// while the worker runs, e.g. when the run deadline snapshots progress.
#[derive(Debug, Default)]
pub struct TaskCounters {
    success: AtomicU64,
    failure: AtomicU64,
}

impl TaskCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, success: bool) {
        if success {
            self.success.fetch_add(1, Ordering::Release);
        } else {
            self.failure.fetch_add(1, Ordering::Release);
        }
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Acquire)
    }

    pub fn failure(&self) -> u64 {
        self.failure.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, url: &str) -> TargetTally {
        TargetTally {
            url: url.to_string(),
            success: self.success(),
            failure: self.failure(),
            finished: false,
        }
    }
}

/// Final or partial counts of one target, as merged into the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTally {
    pub url: String,
    pub success: u64,
    pub failure: u64,
    /// Whether every configured attempt completed.
    pub finished: bool,
}

impl TargetTally {
    pub fn attempts(&self) -> u64 {
        self.success + self.failure
    }
}
