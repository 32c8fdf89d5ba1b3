//! Concurrent HTTP HEAD availability prober.
//!
//! An [`Orchestrator`] starts one [`Prober`] per target URL. Each prober issues
//! its HEAD requests sequentially, each bounded by the request timeout, and
//! counts successes and failures. The orchestrator merges the per-target
//! tallies into a [`RunSummary`], optionally bounded by a run deadline.

pub mod cli;
pub mod config;
pub mod error;
pub mod http_probe;
pub mod orchestrator;
pub mod report;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ProbeSettings, load_config};
pub use error::ConfigError;
pub use http_probe::prelude::{AttemptOutcome, Classification, FailureKind, Prober};
pub use orchestrator::{Orchestrator, RunState, RunStatus, RunSummary};
