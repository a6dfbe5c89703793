//! # lb-config
//! leetboard/crates/lb-config/src/lib.rs
//!
//! Process settings, layered as: built-in defaults, then an optional `.env`
//! file, then `LEETBOARD_*` environment variables.

use config::{Config, Environment};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "LEETBOARD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: SecretString,
    pub database_max_connections: u32,
    pub database_timeout_secs: u64,

    pub upload_dir: PathBuf,
    pub upload_url_prefix: String,

    pub avatar_api_base_url: String,
    pub avatar_catalog_size: u32,
    pub avatar_timeout_secs: u64,

    pub session_ttl_days: u32,
    pub sweep_interval_secs: u64,

    pub log_level: String,
    pub log_format: LogFormat,
}

impl Settings {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    /// Like [`Settings::load`] but reads variables from `vars` instead of the
    /// process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn build(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("database_url", "sqlite://leetboard.db?mode=rwc")?
            .set_default("database_max_connections", 5)?
            .set_default("database_timeout_secs", 5)?
            .set_default("upload_dir", "./data/uploads")?
            .set_default("upload_url_prefix", "/static/uploads")?
            .set_default("avatar_api_base_url", "https://rickandmortyapi.com/api/character")?
            .set_default("avatar_catalog_size", 826)?
            .set_default("avatar_timeout_secs", 5)?
            .set_default("session_ttl_days", 7)?
            .set_default("sweep_interval_secs", 60)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("database_max_connections", u64::from(self.database_max_connections)),
            ("database_timeout_secs", self.database_timeout_secs),
            ("avatar_catalog_size", u64::from(self.avatar_catalog_size)),
            ("avatar_timeout_secs", self.avatar_timeout_secs),
            ("session_ttl_days", u64::from(self.session_ttl_days)),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ];
        if let Some((key, _)) = non_zero.into_iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid {
                key,
                reason: "must be greater than zero".into(),
            });
        }
        if self.avatar_api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "avatar_api_base_url",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn database_timeout(&self) -> Duration {
        Duration::from_secs(self.database_timeout_secs)
    }

    pub fn avatar_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
