use std::path::Path;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::ConfigError;

use super::probe_config::{
    DEFAULT_REPEAT_COUNT, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_USER_AGENT, ProbeConfig,
};

/// Settings shared by every worker of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub repeat_count: u32,
    pub request_timeout: Duration,
    pub global_deadline: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub stagger: Duration,
    pub verbose: bool,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            repeat_count: DEFAULT_REPEAT_COUNT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            global_deadline: None,
            idle_timeout: None,
            stagger: Duration::ZERO,
            verbose: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repeat_count == 0 {
            return Err(ConfigError::InvalidSetting(
                "repeat count must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "request timeout must be positive".to_string(),
            ));
        }
        if self.global_deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidSetting(
                "global deadline must be positive".to_string(),
            ));
        }
        if self.idle_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidSetting(
                "idle timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct AppConfig {
    pub settings: ProbeSettings,
    pub targets: Vec<String>,
}

/// Load the application configuration from the command line and the optional YAML file.
/// Command line values win over the file, the file wins over the defaults.
/// The target list comes from the positional URLs, then `--file`, then the file's `targets`.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let file_config = match &cli.config {
        Some(path) => read_probe_config(path)?,
        None => ProbeConfig::default(),
    };

    let defaults = ProbeSettings::default();
    let settings = ProbeSettings {
        repeat_count: cli
            .count
            .or(file_config.repeat_count)
            .unwrap_or(defaults.repeat_count),
        request_timeout: cli
            .timeout
            .or(file_config.request_timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        global_deadline: cli
            .deadline
            .or(file_config.global_deadline_seconds)
            .map(Duration::from_secs),
        idle_timeout: cli
            .idle_timeout
            .or(file_config.idle_timeout_seconds)
            .map(Duration::from_secs),
        stagger: cli
            .stagger_ms
            .or(file_config.stagger_millis)
            .map(Duration::from_millis)
            .unwrap_or(defaults.stagger),
        verbose: cli.verbose || file_config.verbose.unwrap_or(defaults.verbose),
        user_agent: file_config.user_agent.unwrap_or(defaults.user_agent),
    };
    settings.validate()?;

    let targets = resolve_targets(cli, file_config.targets)?;
    log::info!(
        "Probing {} target(s), {} attempt(s) each, request timeout {:?}",
        targets.len(),
        settings.repeat_count,
        settings.request_timeout
    );

    Ok(AppConfig { settings, targets })
}

fn read_probe_config(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&config_str)?)
}

fn resolve_targets(cli: &Cli, file_targets: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let targets = if !cli.urls.is_empty() {
        cli.urls.clone()
    } else if let Some(path) = &cli.file {
        load_targets_from_file(path)?
    } else {
        file_targets
    };

    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    Ok(targets)
}

/// Read newline-delimited URLs, skipping blank lines.
pub fn load_targets_from_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::TargetSource {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_target_list(&data))
}

pub fn parse_target_list(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
