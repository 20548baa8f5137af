//! Process configuration shared by the trendpulse server and CLI.

mod app_config;
mod config;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ScorerBackend};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
