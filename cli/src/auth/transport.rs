//! HTTP transport for OAuth requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::auth::form::Form;
use crate::error::{HubError, Result};

/// Sends form-encoded POSTs to the OAuth server.
///
/// Implementations return the response body whatever the status code:
/// OAuth servers report `authorization_pending` and other errors as JSON
/// bodies on 4xx responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `form` to `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Transport`] if no response was received.
    async fn post_form(&self, url: &Url, form: Form) -> Result<String>;
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new transport with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("hubstats/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, url: &Url, form: Form) -> Result<String> {
        let response = self
            .client
            .post(url.clone())
            .header(http::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, %url, "OAuth server returned non-success status");
        }

        response
            .text()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))
    }
}
