//! Error types and result aliases for hubstats.
//!
//! This module provides a single error enum covering:
//! - The OAuth 2.0 failure taxonomy (transport, parse, protocol, schema,
//!   timeout and local listener failures)
//! - GitHub API failures
//! - Configuration and local storage failures
//!
//! Every OAuth failure is terminal for the current attempt. The only
//! automatic retry is the device-flow poll loop, which never surfaces
//! `authorization_pending` as an error.

use thiserror::Error;

/// Main error type for hubstats operations.
///
/// Each variant includes a user-friendly message. Use
/// [`requires_reauth`](Self::requires_reauth) and
/// [`is_retriable`](Self::is_retriable) to decide how to react.
#[derive(Error, Debug)]
pub enum HubError {
    /// No refresh token is available to mint access tokens.
    #[error("Not authenticated. Run 'hubstats auth login' to authenticate.")]
    NotAuthenticated,

    /// The OAuth server could not be reached or the request failed in flight.
    #[error("Request to the OAuth server failed: {0}. Check your network connection.")]
    Transport(String),

    /// The OAuth server returned a body that is not JSON.
    #[error("Failed to parse response from the OAuth server: {0}")]
    Parse(String),

    /// The OAuth server returned a structured error other than `authorization_pending`.
    #[error("OAuth server returned error '{error}'{}", .description.as_deref().map(|d| format!(" - {d}")).unwrap_or_default())]
    Protocol {
        /// The `error` field of the response.
        error: String,
        /// The `error_description` field, if present.
        description: Option<String>,
    },

    /// A required response field is missing or malformed.
    #[error("Unexpected response from the OAuth server: {0}")]
    Schema(String),

    /// The server issued a token that is not a bearer token.
    #[error("Expected token type 'Bearer', received '{0}'")]
    UnsupportedTokenType(String),

    /// The user did not complete authorization in time.
    #[error("{0}. Run 'hubstats auth login' again to restart authorization.")]
    Timeout(String),

    /// The local redirect listener could not be started or used.
    #[error("Local redirect listener failed: {0}")]
    LocalListener(String),

    /// The authorization attempt was cancelled by the caller.
    #[error("Authorization was cancelled.")]
    Cancelled,

    /// API returned a non-success status code.
    #[error("API request failed ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API returned 401 Unauthorized.
    #[error("GitHub returned unauthorized (401). Run 'hubstats auth login' to re-authenticate.")]
    Unauthorized,

    /// API server is unreachable.
    #[error("GitHub API is unavailable. Check your network connection or try again later.")]
    ApiUnavailable,

    /// Network error during an API request.
    #[error("Network error: {0}. Check your internet connection.")]
    Network(String),

    /// Stored credentials are malformed or corrupted.
    #[error("Invalid stored credentials. Try 'hubstats auth logout' then 'hubstats auth login'.")]
    InvalidCredentials,

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON or TOML serialization/deserialization failed.
    #[error("Data serialization error: {0}. This may indicate corrupted data.")]
    Serialization(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HubError {
    /// Builds a [`HubError::Protocol`] from raw response fields.
    pub fn protocol(error: impl Into<String>, description: Option<String>) -> Self {
        Self::Protocol {
            error: error.into(),
            description,
        }
    }

    /// Checks if this error can be resolved by re-running interactive authorization.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::Unauthorized
                | Self::InvalidCredentials
                | Self::Protocol { .. }
                | Self::Timeout(_)
        )
    }

    /// Checks if this error is transient and a later attempt might succeed.
    ///
    /// Nothing in the OAuth client retries on its own; this only informs
    /// the caller.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Network(_) | Self::ApiUnavailable
        )
    }
}

/// Result type alias using [`HubError`].
pub type Result<T> = std::result::Result<T, HubError>;

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for HubError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ApiUnavailable
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for HubError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            // Token failures raised by the auth middleware keep their type.
            reqwest_middleware::Error::Middleware(e) => match e.downcast::<Self>() {
                Ok(hub) => hub,
                Err(other) => Self::Network(other.to_string()),
            },
        }
    }
}
