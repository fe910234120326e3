//! Configuration management for hubstats.

pub mod paths;
pub mod settings;

pub use paths::config_file;
pub use settings::{ApiConfig, HubConfig, OAuthSettings};

use std::path::Path;

use crate::error::{HubError, Result};

/// Load configuration from the default config file.
///
/// If the config file doesn't exist, returns default configuration.
pub fn load_config() -> Result<HubConfig> {
    let path = config_file()?;
    load_config_from(&path)
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<HubConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(HubConfig::default().with_env_overrides());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: HubConfig =
        toml::from_str(&contents).map_err(|e| HubError::ConfigRead(e.to_string()))?;

    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.oauth.token_url, "https://github.com/login/oauth/access_token");
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[oauth]\nscope = \"public_repo\"\nredirect_timeout_secs = 15\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.oauth.scope, "public_repo");
        assert_eq!(config.oauth.redirect_timeout_secs, 15);
    }

    #[test]
    fn malformed_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[oauth\nscope = ").unwrap();

        assert!(matches!(load_config_from(&path), Err(HubError::ConfigRead(_))));
    }
}
