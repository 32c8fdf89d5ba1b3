use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run before any worker is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No target URLs were supplied by any source.
    #[error("no targets to probe")]
    NoTargets,

    /// The newline-delimited target file could not be read.
    #[error("failed to read target list {}", path.display())]
    TargetSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML configuration file could not be read.
    #[error("failed to read config file {}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML configuration file is not valid.
    #[error("invalid config file")]
    InvalidConfig(#[from] serde_yaml::Error),

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client")]
    HttpClient(#[from] reqwest::Error),

    /// A setting is out of range.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
