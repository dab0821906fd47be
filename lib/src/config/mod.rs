// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_serializers;
pub mod config_structs;

use std::path::Path;

use ::config::{Config, ConfigBuilder, Environment, File};
use ::config::builder::DefaultState;
use log::{debug, info};

pub use config_defaults::*;
pub use config_structs::{SchedulingConfig, StorageConfig, StorageEngineType};

/// Layers the optional YAML file under `CLINIC_*` environment variables.
/// Callers deserialize whatever sections they own from the built `Config`.
pub fn config_builder(path: Option<&Path>) -> ConfigBuilder<DefaultState> {
    let mut builder = Config::builder();
    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if file.exists() {
        info!("Loading configuration from {:?}", file);
        builder = builder.add_source(File::from(file));
    } else {
        debug!("Config file {:?} not found, using defaults and environment", file);
    }
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    )
}
