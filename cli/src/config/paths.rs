//! Platform-specific path utilities for hubstats.

use std::path::PathBuf;

use crate::error::{HubError, Result};

/// Get the configuration directory for hubstats.
///
/// - Linux: `~/.config/hubstats`
/// - macOS: `~/Library/Application Support/hubstats`
/// - Windows: `%APPDATA%\hubstats`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| HubError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("hubstats"))
}

/// Get the data directory for hubstats.
///
/// - Linux: `~/.local/share/hubstats`
/// - macOS: `~/Library/Application Support/hubstats`
/// - Windows: `%APPDATA%\hubstats`
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| HubError::Config("Cannot determine data directory".to_string()))?;
    Ok(base.join("hubstats"))
}

/// Get the main configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the stored refresh token path.
pub fn credentials_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("credentials.json"))
}
