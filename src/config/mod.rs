// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;
mod settings;
mod validation;

pub use models::*;
pub use settings::WorkerSettings;

use crate::error::{ProxyError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest, applied by the caller)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(Self::default_config_path);

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // An explicit --config path must exist, the default one may not
            .add_source(File::with_name(&file_path).required(path.is_some()))
            // Override with environment variables (e.g. FOLIO_EDGE_SERVER__PORT)
            .add_source(
                Environment::with_prefix("FOLIO_EDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("worker.precache")
                    .with_list_parse_key("worker.api_domains")
                    .with_list_parse_key("worker.cdn_markers"),
            )
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML, suitable as a starting config file.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ProxyError::Config(e.to_string()))
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".folio-edge")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
