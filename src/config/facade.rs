//! ConfigLoader facade over file and environment sources.

use super::SessionConfig;
use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, layering an optional TOML file under
    /// `ITEMGRAPH_*` environment overrides.
    pub fn load(file: Option<&Path>) -> Result<SessionConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        builder
            .add_source(Environment::with_prefix("ITEMGRAPH").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Create default configuration.
    pub fn default() -> SessionConfig {
        SessionConfig::default()
    }
}
