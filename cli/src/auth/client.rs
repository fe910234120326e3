//! OAuth 2.0 client that obtains and maintains tokens for the GitHub API.
//!
//! The client drives two interactive grants (device flow and
//! authorization-code flow with an optional loopback listener), adopts a
//! persisted refresh token when one is available, and mints access tokens
//! on demand.

use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::flow::{Credentials, FlowConfig};
use crate::auth::form;
use crate::auth::prompt::Prompter;
use crate::auth::response::{self, TokenGrant};
use crate::auth::tokens::{AuthState, TokenStore};
use crate::auth::transport::Transport;
use crate::error::{HubError, Result};

/// Candidates shorter than this are not treated as refresh tokens.
const MIN_REFRESH_TOKEN_LEN: usize = 2;

/// OAuth 2.0 client for one account.
///
/// Configure with the setters, then share behind an `Arc`. At most one
/// interactive authorization runs at a time; a second concurrent attempt is
/// rejected.
pub struct OAuth2Client {
    pub(crate) credentials: Credentials,
    pub(crate) flow: FlowConfig,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) prompter: Box<dyn Prompter>,
    pub(crate) cancel: CancellationToken,
    store: RwLock<TokenStore>,
    state: watch::Sender<AuthState>,
    attempt: Mutex<()>,
}

impl OAuth2Client {
    /// Create a client with an empty token store.
    pub fn new(
        credentials: Credentials,
        flow: FlowConfig,
        transport: impl Transport + 'static,
        prompter: impl Prompter + 'static,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            credentials,
            flow,
            transport: Box::new(transport),
            prompter: Box::new(prompter),
            cancel: CancellationToken::new(),
            store: RwLock::new(TokenStore::default()),
            state,
            attempt: Mutex::new(()),
        }
    }

    /// Abort waits of interactive authorization when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.credentials.client_id = oauth2::ClientId::new(client_id.into());
    }

    pub fn set_client_secret(&mut self, client_secret: impl Into<String>) {
        self.credentials.client_secret = oauth2::ClientSecret::new(client_secret.into());
    }

    pub fn set_authorization_url(&mut self, url: Url) {
        self.flow.authorization_url = url;
    }

    pub fn set_poll_url(&mut self, url: Url) {
        self.flow.poll_url = url;
    }

    pub fn set_token_url(&mut self, url: Url) {
        self.flow.token_url = url;
    }

    pub fn set_scope(&mut self, scope: impl Into<String>) {
        self.flow.scope = scope.into();
    }

    pub fn set_login_hint(&mut self, login_hint: impl Into<String>) {
        self.flow.login_hint = login_hint.into();
    }

    /// `None` selects the device flow.
    pub fn set_redirect_uri(&mut self, redirect_uri: Option<Url>) {
        self.flow.redirect_uri = redirect_uri;
    }

    pub fn set_response_type(&mut self, response_type: impl Into<String>) {
        self.flow.response_type = response_type.into();
    }

    pub fn set_grant_type(&mut self, grant_type: impl Into<String>) {
        self.flow.grant_type = grant_type.into();
    }

    pub fn set_device_grant_type(&mut self, grant_type: impl Into<String>) {
        self.flow.device_grant_type = grant_type.into();
    }

    pub fn set_success_message(&mut self, message: impl Into<String>) {
        self.flow.success_message = message.into();
    }

    /// The flow configuration in effect.
    #[must_use]
    pub const fn flow(&self) -> &FlowConfig {
        &self.flow
    }

    /// Current position in the authorization state machine.
    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The refresh token currently held.
    pub async fn refresh_token(&self) -> Option<String> {
        self.store.read().await.refresh_token().map(str::to_owned)
    }

    /// Adopts `token` verbatim as the refresh token.
    pub async fn set_refresh_token(&self, token: &str) {
        self.store.write().await.set_refresh_token(token);
        self.transition(AuthState::Authorized);
    }

    /// Scope and remaining lifetime of the cached access token.
    pub async fn access_token_info(&self) -> (Option<String>, Option<Duration>) {
        let store = self.store.read().await;
        (
            store.scope().map(str::to_owned),
            store.expires_in(Instant::now()),
        )
    }

    /// Returns a refresh token, running interactive authorization only when
    /// `candidate` does not look like one.
    ///
    /// A candidate of two or more characters is adopted without any network
    /// call. Compare the result with `candidate` to detect a new token that
    /// needs persisting.
    ///
    /// # Errors
    ///
    /// Returns any error from [`request_refresh_token`](Self::request_refresh_token).
    pub async fn ensure_refresh_token(&self, candidate: &str) -> Result<String> {
        if candidate.len() >= MIN_REFRESH_TOKEN_LEN {
            let Ok(_attempt) = self.attempt.try_lock() else {
                return Err(authorization_in_progress());
            };
            self.set_refresh_token(candidate).await;
            return Ok(candidate.to_string());
        }

        self.request_refresh_token().await
    }

    /// Runs interactive authorization and returns the new refresh token.
    ///
    /// The device flow runs when no redirect URI is configured; otherwise
    /// the authorization-code flow runs.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Protocol`] with `authorization_in_progress` if
    /// another attempt is running, or the error that ended this attempt.
    pub async fn request_refresh_token(&self) -> Result<String> {
        let Ok(_attempt) = self.attempt.try_lock() else {
            return Err(authorization_in_progress());
        };

        self.transition(AuthState::PendingUserAction);
        let result = match self.flow.redirect_uri.clone() {
            None => self.run_device_flow().await,
            Some(redirect_uri) => self.run_code_flow(&redirect_uri).await,
        };

        match result {
            Ok(grant) => {
                let refresh_token = self.record_grant(grant).await;
                tracing::info!("Successfully obtained refresh token");
                Ok(refresh_token)
            },
            Err(e) => {
                self.transition(AuthState::Unauthenticated);
                tracing::warn!(error = %e, "Failed to obtain refresh token");
                Err(e)
            },
        }
    }

    /// Returns a bearer token, refreshing it when the cached one has expired.
    ///
    /// A failed refresh leaves the token store untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotAuthenticated`] without a refresh token, or the
    /// error that ended the refresh request.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.store.read().await.valid_access_token(Instant::now()) {
            return Ok(token.to_owned());
        }

        let refresh_token = self
            .refresh_token()
            .await
            .ok_or(HubError::NotAuthenticated)?;

        tracing::info!("Access token is invalid - requesting a new one");
        self.transition(AuthState::Refreshing);

        match self.refresh_access(&refresh_token).await {
            Ok(grant) => {
                let token = grant.access_token.secret().clone();
                self.store.write().await.record_access(grant, Instant::now());
                self.transition(AuthState::Authorized);
                tracing::info!("Successfully obtained new access token");
                Ok(token)
            },
            Err(e) => {
                self.transition(AuthState::Unauthenticated);
                tracing::warn!(error = %e, "Failed to obtain access token");
                Err(e)
            },
        }
    }

    async fn refresh_access(&self, refresh_token: &str) -> Result<crate::auth::tokens::AccessGrant> {
        let body = self
            .transport
            .post_form(
                &self.flow.token_url,
                form::refresh_request(&self.credentials, refresh_token),
            )
            .await?;
        response::parse_access_grant(response::check_error(&body)?)
    }

    /// Stores both tokens from a completed authorization.
    async fn record_grant(&self, grant: TokenGrant) -> String {
        let mut store = self.store.write().await;
        store.set_refresh_token(grant.refresh_token.clone());
        store.record_access(grant.access, Instant::now());
        drop(store);

        self.transition(AuthState::Authorized);
        grant.refresh_token
    }

    pub(crate) fn transition(&self, state: AuthState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Authorization state changed");
        }
    }
}

fn authorization_in_progress() -> HubError {
    HubError::protocol(
        "authorization_in_progress",
        Some("an interactive authorization is already running".to_string()),
    )
}
