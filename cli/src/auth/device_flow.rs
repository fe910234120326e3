//! OAuth 2.0 Device Authorization Grant (RFC 8628).
//!
//! The user enters a short code on another device while the client polls
//! the token endpoint at the server's pace until the grant completes, the
//! server reports an error, or the device code expires.

use std::time::Duration;

use tokio::time::Instant;

use crate::auth::client::OAuth2Client;
use crate::auth::form;
use crate::auth::poll::PollPolicy;
use crate::auth::response::{self, PollOutcome, TokenGrant};
use crate::auth::tokens::AuthState;
use crate::error::Result;

/// Response from the device authorization endpoint.
#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    device_code: String,
    user_code: String,
    verification_url: String,
    expires_in: Duration,
    interval: Duration,
}

impl DeviceAuthorization {
    pub(crate) const fn new(
        device_code: String,
        user_code: String,
        verification_url: String,
        expires_in: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            device_code,
            user_code,
            verification_url,
            expires_in,
            interval,
        }
    }

    pub fn device_code(&self) -> &str {
        &self.device_code
    }

    /// Code the user types at the verification URL.
    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    pub fn verification_url(&self) -> &str {
        &self.verification_url
    }

    /// Lifetime of the device code, counted from the authorization request.
    pub const fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Minimum wait between polls.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl OAuth2Client {
    /// Runs the device flow to completion and returns the grant.
    pub(crate) async fn run_device_flow(&self) -> Result<TokenGrant> {
        let started = Instant::now();

        tracing::debug!(url = %self.flow.authorization_url, "Requesting device code");
        let body = self
            .transport
            .post_form(
                &self.flow.authorization_url,
                form::authorization_request(&self.credentials, &self.flow, None),
            )
            .await?;
        let authorization = response::parse_device_authorization(response::check_error(&body)?)?;

        self.prompter.show_device_code(&authorization);
        self.transition(AuthState::PollingOrWaiting);

        let policy = PollPolicy::new(started, authorization.interval(), authorization.expires_in())?;
        tracing::debug!(
            interval = ?policy.interval(),
            remaining = ?policy.deadline().saturating_duration_since(Instant::now()),
            "Polling for device authorization"
        );

        loop {
            policy.wait(&self.cancel).await?;

            let body = self
                .transport
                .post_form(
                    &self.flow.poll_url,
                    form::device_poll_request(&self.credentials, &self.flow, authorization.device_code()),
                )
                .await?;

            match response::parse_poll_response(&body)? {
                PollOutcome::Pending => tracing::debug!("Authorization pending"),
                PollOutcome::Granted(grant) => return Ok(grant),
            }
        }
    }
}
