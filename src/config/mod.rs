pub mod app_config;
pub mod probe_config;

pub use app_config::{AppConfig, ProbeSettings, load_config};
