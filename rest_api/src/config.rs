// rest_api/src/config.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lib::config::{config_builder, SchedulingConfig, StorageConfig};

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}
pub fn default_port() -> u16 { 8082 }
pub fn default_request_timeout_secs() -> u64 { 30 }
pub fn default_page_limit() -> u32 { 20 }
pub fn default_max_page_limit() -> u32 { 100 }

/// Represents the configuration for the REST API server itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// HS256 signing secret. The server refuses to start without one.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,
    #[serde(default)]
    pub roles_path: Option<PathBuf>,
    #[serde(default)]
    pub directory_seed_path: Option<PathBuf>,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        RestApiConfig {
            host: default_host(),
            port: default_port(),
            jwt_secret: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            roles_path: None,
            directory_seed_path: None,
        }
    }
}

/// Everything the clinic server reads at startup, one section per owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rest: RestApiConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Loads the application configuration from the optional YAML file and
/// `CLINIC_*` environment overrides.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config: AppConfig = config_builder(path)
        .build()
        .context("Failed to build clinic configuration")?
        .try_deserialize()
        .context("Failed to parse clinic configuration")?;
    config
        .scheduling
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid scheduling section")?;
    if config.rest.default_page_limit == 0 || config.rest.default_page_limit > config.rest.max_page_limit {
        anyhow::bail!(
            "rest.default_page_limit ({}) must be between 1 and rest.max_page_limit ({})",
            config.rest.default_page_limit,
            config.rest.max_page_limit
        );
    }
    Ok(config)
}
