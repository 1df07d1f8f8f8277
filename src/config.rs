// src/config.rs

//! Configuration loading utilities.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, a `.env` file, then process environment variables.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "medfeebot.toml";

/// Load, overlay and validate configuration from the process environment.
///
/// An explicit `path` must exist; the implicit default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(env_path) => log::debug!("Loaded environment from {:?}", env_path),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }

    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable variable lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_file(path) {
        Some(file) => {
            log::info!("Loading configuration from {:?}", file);
            Config::load(&file).map_err(|e| {
                AppError::config(format!("Failed to load {}: {}", file.display(), e))
            })?
        }
        None => Config::default(),
    };

    config.apply_env_with(lookup);
    config.validate()?;
    Ok(config)
}

fn config_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}
