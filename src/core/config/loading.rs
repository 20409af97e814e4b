//! Locating and reading the TOML configuration file.

use super::file::ConfigFile;
use crate::core::error::{AppError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_NAME: &str = "mailprobe.toml";

/// Returns the first configuration file that exists: the explicit path if
/// given, then `./mailprobe.toml`, then `~/.config/mailprobe/config.toml`.
///
/// An explicit path that does not exist is an error; the implicit locations
/// are simply skipped.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(AppError::Config(format!(
            "Config file '{}' not found",
            path.display()
        )));
    }

    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }

    if let Ok(home) = std::env::var("HOME") {
        let user = PathBuf::from(home)
            .join(".config")
            .join("mailprobe")
            .join("config.toml");
        if user.is_file() {
            return Ok(Some(user));
        }
    }

    Ok(None)
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    tracing::info!("Loading configuration from {}", path.display());
    let raw = fs::read_to_string(path)?;
    let file: ConfigFile = toml::from_str(&raw)?;
    Ok(file)
}
