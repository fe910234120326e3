//! Client credentials and grant-flow configuration.

use std::time::Duration;

use oauth2::{ClientId, ClientSecret};
use url::Url;

use crate::config::OAuthSettings;
use crate::error::{HubError, Result};

/// Grant type sent when exchanging an authorization code.
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// Grant type sent when polling a device authorization (RFC 8628).
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// How long to wait for the browser to hit the loopback redirect.
pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(60);

/// OAuth client identity, fixed for the life of a client.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: ClientId::new(client_id.into()),
            client_secret: ClientSecret::new(client_secret.into()),
        }
    }
}

/// Endpoints and parameters for both grant flows.
///
/// `redirect_uri` selects the flow: `None` runs the device flow, `Some`
/// runs the authorization-code flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Device authorization endpoint, or browser authorization endpoint.
    pub authorization_url: Url,
    /// Endpoint polled during the device flow.
    pub poll_url: Url,
    /// Endpoint for code exchange and refresh.
    pub token_url: Url,
    pub scope: String,
    pub login_hint: String,
    pub redirect_uri: Option<Url>,
    pub response_type: String,
    pub grant_type: String,
    pub device_grant_type: String,
    /// Send a random `state` with browser authorization and require it back.
    pub send_state: bool,
    /// Shown on the page served by the loopback listener.
    pub success_message: String,
    pub redirect_timeout: Duration,
}

impl FlowConfig {
    /// Creates a device-flow configuration with default grant types.
    pub fn new(authorization_url: Url, poll_url: Url, token_url: Url) -> Self {
        Self {
            authorization_url,
            poll_url,
            token_url,
            scope: String::new(),
            login_hint: String::new(),
            redirect_uri: None,
            response_type: String::new(),
            grant_type: AUTHORIZATION_CODE_GRANT.to_string(),
            device_grant_type: DEVICE_CODE_GRANT.to_string(),
            send_state: true,
            success_message: "API access successfully authorized.".to_string(),
            redirect_timeout: DEFAULT_REDIRECT_TIMEOUT,
        }
    }

    /// Builds a configuration from the `[oauth]` settings table.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidUrl`] if an endpoint cannot be parsed.
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self> {
        let mut config = Self::new(
            Url::parse(&settings.authorization_url)?,
            Url::parse(&settings.poll_url)?,
            Url::parse(&settings.token_url)?,
        );

        config.scope.clone_from(&settings.scope);
        config.login_hint.clone_from(&settings.login_hint);
        config.redirect_uri = match settings.redirect_uri.trim() {
            "" => None,
            uri => Some(Url::parse(uri)?),
        };
        config.response_type.clone_from(&settings.response_type);
        config.grant_type.clone_from(&settings.grant_type);
        config.device_grant_type.clone_from(&settings.device_grant_type);
        config.send_state = settings.send_state;
        config.success_message.clone_from(&settings.success_message);
        config.redirect_timeout = Duration::from_secs(settings.redirect_timeout_secs);

        Ok(config)
    }

    /// True when no redirect URI is configured and the device flow applies.
    #[must_use]
    pub const fn is_limited_input(&self) -> bool {
        self.redirect_uri.is_none()
    }

    /// Grant type sent with device-code polls.
    #[must_use]
    pub fn poll_grant_type(&self) -> &str {
        if self.device_grant_type.is_empty() {
            &self.grant_type
        } else {
            &self.device_grant_type
        }
    }
}

/// Reads client credentials from the `[oauth]` settings table.
///
/// # Errors
///
/// Returns [`HubError::Config`] if the client id or secret is missing.
pub fn credentials_from_settings(settings: &OAuthSettings) -> Result<Credentials> {
    let client_id = settings
        .client_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            HubError::Config("No OAuth client_id configured. Set [oauth].client_id or HUBSTATS_CLIENT_ID.".to_string())
        })?;
    let client_secret = settings
        .client_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| {
            HubError::Config("No OAuth client_secret configured. Set [oauth].client_secret or HUBSTATS_CLIENT_SECRET.".to_string())
        })?;

    Ok(Credentials::new(client_id, client_secret))
}
