//! Application configuration settings.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::flow::{AUTHORIZATION_CODE_GRANT, DEVICE_CODE_GRANT};

/// Main configuration for hubstats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// OAuth client and flow settings.
    pub oauth: OAuthSettings,
    /// GitHub REST API settings.
    pub api: ApiConfig,
}

/// OAuth client configuration.
///
/// Defaults target GitHub's device flow. Setting `redirect_uri` switches
/// to the authorization-code flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorization_url: String,
    pub poll_url: String,
    pub token_url: String,
    pub scope: String,
    pub login_hint: String,
    /// Empty for the device flow.
    pub redirect_uri: String,
    pub response_type: String,
    pub grant_type: String,
    pub device_grant_type: String,
    pub send_state: bool,
    pub success_message: String,
    pub redirect_timeout_secs: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorization_url: "https://github.com/login/device/code".to_string(),
            poll_url: "https://github.com/login/oauth/access_token".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            scope: "repo".to_string(),
            login_hint: String::new(),
            redirect_uri: String::new(),
            response_type: String::new(),
            grant_type: AUTHORIZATION_CODE_GRANT.to_string(),
            device_grant_type: DEVICE_CODE_GRANT.to_string(),
            send_state: true,
            success_message: "API access successfully authorized.".to_string(),
            redirect_timeout_secs: 60,
        }
    }
}

/// API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GitHub API base URL.
    #[serde(with = "url_serde")]
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of retries for failed requests.
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.github.com").expect("valid default URL"),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Custom serde module for URL serialization.
mod url_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const CLIENT_ID: &str = "HUBSTATS_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "HUBSTATS_CLIENT_SECRET";
    pub const API_URL: &str = "HUBSTATS_API_URL";
    pub const LOG_LEVEL: &str = "HUBSTATS_LOG";
}

impl HubConfig {
    /// Apply environment variable overrides to the configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `var`.
    #[must_use]
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(id) = var(env::CLIENT_ID).filter(|v| !v.is_empty()) {
            self.oauth.client_id = Some(id);
        }

        if let Some(secret) = var(env::CLIENT_SECRET).filter(|v| !v.is_empty()) {
            self.oauth.client_secret = Some(secret);
        }

        if let Some(url) = var(env::API_URL) {
            match Url::parse(&url) {
                Ok(parsed) => self.api.base_url = parsed,
                Err(e) => tracing::warn!(%url, error = %e, "Ignoring invalid {}", env::API_URL),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_target_github_device_flow() {
        let config = HubConfig::default();
        assert_eq!(config.oauth.authorization_url, "https://github.com/login/device/code");
        assert!(config.oauth.redirect_uri.is_empty());
        assert!(config.oauth.send_state);
        assert_eq!(config.oauth.redirect_timeout_secs, 60);
        assert_eq!(config.api.base_url.as_str(), "https://api.github.com/");
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let config: HubConfig = toml::from_str(
            r#"
            [oauth]
            client_id = "Iv1.abc"
            redirect_uri = "http://localhost:8765/"

            [api]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.oauth.client_id.as_deref(), Some("Iv1.abc"));
        assert_eq!(config.oauth.redirect_uri, "http://localhost:8765/");
        assert_eq!(config.oauth.scope, "repo");
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn overrides_replace_credentials_and_api_url() {
        let vars = HashMap::from([
            (env::CLIENT_ID, "env-id"),
            (env::CLIENT_SECRET, "env-secret"),
            (env::API_URL, "https://ghe.example.com/api/v3/"),
        ]);
        let config = HubConfig::default()
            .with_overrides(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.oauth.client_id.as_deref(), Some("env-id"));
        assert_eq!(config.oauth.client_secret.as_deref(), Some("env-secret"));
        assert_eq!(config.api.base_url.as_str(), "https://ghe.example.com/api/v3/");
    }

    #[test]
    fn invalid_api_url_override_is_ignored() {
        let config = HubConfig::default()
            .with_overrides(|key| (key == env::API_URL).then(|| "not a url".to_string()));
        assert_eq!(config.api.base_url.as_str(), "https://api.github.com/");
    }
}
