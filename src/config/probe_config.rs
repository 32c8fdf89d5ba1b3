use serde::Deserialize;

pub const DEFAULT_REPEAT_COUNT: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 1;
pub const DEFAULT_USER_AGENT: &str = "headprobe/1.0";

/// The probe configuration as read from the YAML config file.
/// Every field is optional; anything left out falls back to the command line or the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Number of HEAD requests issued against each target.
    pub repeat_count: Option<u32>,

    /// Timeout applied to every single HEAD request (connect and response).
    pub request_timeout_seconds: Option<u64>,

    /// Upper bound for the whole run. Unset means the run waits for every target.
    pub global_deadline_seconds: Option<u64>,

    /// Ends the run when no attempt finishes for this long.
    pub idle_timeout_seconds: Option<u64>,

    /// Delay between the start of consecutive workers.
    pub stagger_millis: Option<u64>,

    /// Print one line per attempt.
    pub verbose: Option<bool>,

    pub user_agent: Option<String>,

    /// Target URLs, used when none are given on the command line.
    #[serde(default)]
    pub targets: Vec<String>,
}
