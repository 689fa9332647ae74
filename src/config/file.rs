//! Configuration file loading.

use crate::config::types::ConductorConfig;
use crate::error::ConfigurationError;
use std::path::{Path, PathBuf};

/// Project-local configuration file name.
const LOCAL_CONFIG_NAME: &str = "conductor.toml";

/// File name within the per-user configuration directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application directory name under the user's config dir.
const APP_NAME: &str = "conductor";

/// Loads configuration from the default search paths.
///
/// Search order:
/// 1. `./conductor.toml`
/// 2. `$XDG_CONFIG_HOME/conductor/config.toml`
///
/// Returns the built-in defaults if no file exists.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read, parsed or
/// validated.
pub fn load() -> Result<ConductorConfig, ConfigurationError> {
    for path in search_paths() {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading configuration");
            return from_path(&path);
        }
    }
    tracing::debug!("no configuration file found, using defaults");
    Ok(ConductorConfig::default())
}

/// Loads configuration from a specific file path.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or
/// fails validation.
pub fn from_path(path: &Path) -> Result<ConductorConfig, ConfigurationError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigurationError::file(path.display().to_string(), e.to_string()))?;

    from_str(&contents).map_err(|e| ConfigurationError::file(path.display().to_string(), e.to_string()))
}

/// Parses and validates configuration from a TOML string.
///
/// Tables and keys that are absent take their default values.
///
/// # Errors
///
/// Returns an error if the TOML is invalid, has an unknown agent type, or
/// fails validation.
pub fn from_str(toml_str: &str) -> Result<ConductorConfig, ConfigurationError> {
    let config: ConductorConfig = toml::from_str(toml_str)
        .map_err(|e| ConfigurationError::invalid_field("config", format!("invalid TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Returns the paths that would be searched for configuration files.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];
    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }
    paths
}

/// Returns the per-user configuration directory, `~/.config/conductor` on
/// most systems.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
