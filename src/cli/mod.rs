// CLI module for folio-edge
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// folio-edge - offline-first caching edge for the portfolio dashboard
#[derive(Parser, Debug)]
#[command(name = "folio-edge", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.folio-edge/config.toml)
    #[arg(long, short = 'c', env = "FOLIO_EDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the cache generation name for this build
    #[arg(long)]
    pub cache_version: Option<String>,

    /// Override the listening port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply CLI overrides, which take precedence over every other source
    pub fn apply(&self, config: &mut crate::config::AppConfig) {
        if let Some(version) = &self.cache_version {
            config.worker.cache_version = version.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
