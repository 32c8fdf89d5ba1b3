use std::fmt;

/// Why a single attempt counted as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The target could not be parsed as a URL.
    InvalidUrl(String),
    /// Connection refused, DNS or TLS failure.
    Transport(String),
    /// The per-request timeout elapsed.
    Timeout,
    /// A response with status >= 400.
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success { status: u16 },
    Failure(FailureKind),
}

impl Classification {
    /// Status codes below 400 are a live endpoint, including redirects.
    pub fn from_status(status: u16) -> Self {
        if status >= 400 {
            Classification::Failure(FailureKind::Status(status))
        } else {
            Classification::Success { status }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Classification::Success { .. })
    }
}

/// Result of one HEAD request against one target.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// Position of the target in the input list.
    pub target_index: usize,
    pub url: String,
    pub attempt: u32,
    pub classification: Classification,
    pub http_time: f64,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Success { status } => write!(f, "{status}"),
            Classification::Failure(FailureKind::Status(status)) => {
                write!(f, "failed ({status})")
            }
            Classification::Failure(FailureKind::Timeout) => write!(f, "failed (timeout)"),
            Classification::Failure(FailureKind::InvalidUrl(e)) => {
                write!(f, "failed (invalid url: {e})")
            }
            Classification::Failure(FailureKind::Transport(e)) => write!(f, "failed ({e})"),
        }
    }
}
