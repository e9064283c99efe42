//! CLI configuration: the shared `tessel_config` types plus `GlobalOpts`
//! flag overrides (--config, --url, --timeout, --insecure).

use std::path::PathBuf;

pub use tessel_config::{Config, config_path, load_config_from};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config`, else the platform default.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply flag overrides on top.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&active_path(global))?;
    if let Some(url) = &global.url {
        cfg.api.url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        cfg.api.timeout = timeout;
    }
    if global.insecure {
        cfg.api.insecure = true;
    }
    Ok(cfg)
}
