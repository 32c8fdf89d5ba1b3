pub mod counters;
pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::counters::{TargetTally, TaskCounters};
    pub use super::probe::{Prober, build_client, head_once};
    pub use super::result::{AttemptOutcome, Classification, FailureKind};
}

use std::fmt::Write;

/// Render an error with its whole `source()` chain on one line.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}
