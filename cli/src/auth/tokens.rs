//! Token state held by the OAuth client.

use std::time::Duration;

use oauth2::{AccessToken, RefreshToken};
use tokio::time::Instant;

/// Progress of the OAuth client through an authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No usable refresh token.
    #[default]
    Unauthenticated,
    /// Waiting for the user to visit a URL or enter a code.
    PendingUserAction,
    /// Polling the token endpoint or waiting for the loopback redirect.
    PollingOrWaiting,
    /// A refresh token is held.
    Authorized,
    /// Exchanging the refresh token for a new access token.
    Refreshing,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::PendingUserAction => write!(f, "pending user action"),
            Self::PollingOrWaiting => write!(f, "waiting for authorization"),
            Self::Authorized => write!(f, "authorized"),
            Self::Refreshing => write!(f, "refreshing"),
        }
    }
}

/// An access token parsed from a successful token response.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    /// The bearer token.
    pub access_token: AccessToken,
    /// Granted scopes, space separated.
    pub scope: String,
    /// Lifetime from the moment the response was received.
    pub expires_in: Option<Duration>,
}

/// Access and refresh tokens for one session.
///
/// The refresh token is only replaced by an explicit
/// [`set_refresh_token`](Self::set_refresh_token); a failed refresh never
/// clears it. The access token lives for the process only.
#[derive(Debug, Default)]
pub struct TokenStore {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    expires_at: Option<Instant>,
    scope: Option<String>,
}

impl TokenStore {
    /// Returns the refresh token, if one is held.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.secret().as_str())
    }

    /// Replaces the refresh token.
    ///
    /// A different token drops the cached access token minted from the old one.
    pub fn set_refresh_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        if self.refresh_token() != Some(token.as_str()) {
            self.access_token = None;
            self.expires_at = None;
            self.scope = None;
        }
        self.refresh_token = Some(RefreshToken::new(token));
    }

    /// Returns the access token if it is non-empty and `now` is before its expiry.
    ///
    /// A token received without `expires_in` is never considered valid.
    #[must_use]
    pub fn valid_access_token(&self, now: Instant) -> Option<&str> {
        let token = self.access_token.as_ref()?.secret();
        let expires_at = self.expires_at?;
        (!token.is_empty() && now < expires_at).then_some(token.as_str())
    }

    /// Records a successful token response received at `now`.
    ///
    /// A lifetime too long to represent is treated as no expiry.
    pub fn record_access(&mut self, grant: AccessGrant, now: Instant) {
        self.expires_at = grant
            .expires_in
            .and_then(|lifetime| now.checked_add(lifetime));
        self.access_token = Some(grant.access_token);
        self.scope = Some(grant.scope);
    }

    /// Scopes granted with the current access token.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Remaining lifetime of the access token.
    #[must_use]
    pub fn expires_in(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(token: &str, expires_in: Option<u64>) -> AccessGrant {
        AccessGrant {
            access_token: AccessToken::new(token.to_string()),
            scope: "repo".to_string(),
            expires_in: expires_in.map(Duration::from_secs),
        }
    }

    #[test]
    fn empty_store_has_no_tokens() {
        let store = TokenStore::default();
        assert!(store.refresh_token().is_none());
        assert!(store.valid_access_token(Instant::now()).is_none());
    }

    #[test]
    fn access_token_valid_until_expiry() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.record_access(grant("A1", Some(60)), now);

        assert_eq!(store.valid_access_token(now), Some("A1"));
        assert_eq!(
            store.valid_access_token(now + Duration::from_secs(59)),
            Some("A1")
        );
        assert!(store
            .valid_access_token(now + Duration::from_secs(60))
            .is_none());
        assert_eq!(store.scope(), Some("repo"));
    }

    #[test]
    fn access_token_without_expiry_is_not_reused() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.record_access(grant("A1", None), now);

        assert!(store.valid_access_token(now).is_none());
    }

    #[test]
    fn empty_access_token_is_never_valid() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.record_access(grant("", Some(3600)), now);

        assert!(store.valid_access_token(now).is_none());
    }

    #[test]
    fn recording_access_keeps_refresh_token() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.set_refresh_token("R1");
        store.record_access(grant("A1", Some(60)), now);

        assert_eq!(store.refresh_token(), Some("R1"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut store = TokenStore::default();
        store.set_refresh_token("super-secret-refresh");
        store.record_access(grant("super-secret-access", Some(60)), Instant::now());

        let debug = format!("{store:?}");
        assert!(!debug.contains("super-secret-refresh"));
        assert!(!debug.contains("super-secret-access"));
    }

    #[test]
    fn unrepresentable_lifetime_is_not_tracked() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.record_access(grant("A1", Some(u64::MAX)), now);

        assert!(store.valid_access_token(now).is_none());
        assert!(store.expires_in(now).is_none());
        assert_eq!(store.scope(), Some("repo"));
    }

    #[test]
    fn new_refresh_token_drops_cached_access_token() {
        let now = Instant::now();
        let mut store = TokenStore::default();
        store.set_refresh_token("R1");
        store.record_access(grant("A1", Some(60)), now);

        store.set_refresh_token("R1");
        assert_eq!(store.valid_access_token(now), Some("A1"));

        store.set_refresh_token("R2");
        assert!(store.valid_access_token(now).is_none());
        assert!(store.scope().is_none());
        assert_eq!(store.refresh_token(), Some("R2"));
    }
}
