use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "headprobe",
    version,
    about = "Probe HTTP endpoints with repeated HEAD requests"
)]
pub struct Cli {
    /// Target URLs. Take precedence over --file and the config file.
    pub urls: Vec<String>,

    /// Repeat N times to request each URL
    #[arg(short = 'c', long = "count")]
    pub count: Option<u32>,

    /// Load URLs from a newline-delimited file
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Timeout per HEAD request, in seconds
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Stop collecting results after this many seconds
    #[arg(short = 'd', long = "deadline")]
    pub deadline: Option<u64>,

    /// Stop collecting results when no attempt finishes for this many seconds
    #[arg(long = "idle-timeout")]
    pub idle_timeout: Option<u64>,

    /// Delay between starting consecutive targets, in milliseconds
    #[arg(long = "stagger-ms")]
    pub stagger_ms: Option<u64>,

    /// Print one line per attempt
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// YAML config file
    #[arg(long = "config", env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}
