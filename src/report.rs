use unicode_truncate::UnicodeTruncateStr;
use unicode_width::UnicodeWidthStr;

use crate::http_probe::prelude::AttemptOutcome;

/// Receives attempt outcomes while a run is being collected.
pub trait OutcomeSink: Send {
    fn attempt(&mut self, outcome: &AttemptOutcome);
}

/// Prints one `[index] url: outcome` line per attempt to stdout.
pub struct ConsoleSink {
    url_width: usize,
}

impl ConsoleSink {
    pub fn new(targets: &[String]) -> Self {
        let url_width = targets.iter().map(|t| t.width()).max().unwrap_or(10);
        Self { url_width }
    }
}

impl OutcomeSink for ConsoleSink {
    fn attempt(&mut self, outcome: &AttemptOutcome) {
        println!("{}", format_attempt(outcome, self.url_width));
    }
}

/// Truncate or pad `input` to `width` terminal columns.
fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, used) = input.unicode_truncate(width);
    format!("{truncated}{}", " ".repeat(width - used))
}

pub fn format_attempt(outcome: &AttemptOutcome, url_width: usize) -> String {
    let label = format!("{}:", outcome.url);
    format!(
        "[{}] {} {} ({:.2}ms)",
        outcome.attempt,
        to_fixed_width(&label, url_width + 1),
        outcome.classification,
        outcome.http_time * 1000.0
    )
}
