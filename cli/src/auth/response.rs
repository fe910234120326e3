//! Interpretation of OAuth server responses.

use std::time::Duration;

use oauth2::AccessToken;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::device_flow::DeviceAuthorization;
use crate::auth::tokens::AccessGrant;
use crate::error::{HubError, Result};

/// The `error` value that means "keep polling".
pub const AUTHORIZATION_PENDING: &str = "authorization_pending";

/// A successful response carrying both a refresh credential and an access token.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub refresh_token: String,
    pub access: AccessGrant,
}

/// Result of one device-flow poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Pending,
    Granted(TokenGrant),
}

#[derive(Deserialize)]
struct DeviceAuthorizationFields {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: String,
    expires_in: f64,
    #[serde(default = "default_interval")]
    interval: f64,
}

/// RFC 8628 section 3.2: poll every 5 seconds unless told otherwise.
const fn default_interval() -> f64 {
    5.0
}

#[derive(Deserialize)]
struct AccessFields {
    access_token: String,
    token_type: String,
    scope: String,
    expires_in: Option<f64>,
}

#[derive(Deserialize)]
struct RefreshFields {
    refresh_token: Option<String>,
    access_token: Option<String>,
}

/// Parses a body as JSON and rejects any `error` other than `authorization_pending`.
///
/// # Errors
///
/// Returns [`HubError::Parse`] for a non-JSON body and [`HubError::Protocol`]
/// for a server error.
pub fn check_error(body: &str) -> Result<Value> {
    let root: Value = serde_json::from_str(body).map_err(|e| {
        tracing::debug!(body, "Unparsable response body");
        HubError::Parse(e.to_string())
    })?;

    let error = root
        .get("error")
        .and_then(Value::as_str)
        .filter(|error| *error != AUTHORIZATION_PENDING)
        .map(str::to_owned);
    if let Some(error) = error {
        let description = root
            .get("error_description")
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Err(HubError::protocol(error, description));
    }

    Ok(root)
}

/// True if the response is the "not yet authorized" signal.
#[must_use]
pub fn is_pending(root: &Value) -> bool {
    root.get("error").and_then(Value::as_str) == Some(AUTHORIZATION_PENDING)
}

/// Reads the device authorization returned by the authorization endpoint.
pub fn parse_device_authorization(root: Value) -> Result<DeviceAuthorization> {
    let fields: DeviceAuthorizationFields = read_fields(root, "device authorization")?;

    Ok(DeviceAuthorization::new(
        fields.device_code,
        fields.user_code,
        fields.verification_url,
        seconds("expires_in", fields.expires_in)?,
        seconds("interval", fields.interval)?,
    ))
}

/// Reads an access-token response.
///
/// `token_type` must be `Bearer` in any letter case.
pub fn parse_access_grant(root: Value) -> Result<AccessGrant> {
    let fields: AccessFields = read_fields(root, "access token")?;

    if !fields.token_type.eq_ignore_ascii_case("bearer") {
        return Err(HubError::UnsupportedTokenType(fields.token_type));
    }

    tracing::info!(scopes = %fields.scope, "Received token for the following scopes");

    Ok(AccessGrant {
        access_token: AccessToken::new(fields.access_token),
        scope: fields.scope,
        expires_in: fields
            .expires_in
            .map(|secs| seconds("expires_in", secs))
            .transpose()?,
    })
}

/// Reads the response that completes an interactive authorization.
///
/// The refresh credential is `refresh_token`, or `access_token` when the
/// server issues no separate refresh token.
pub fn parse_token_grant(root: Value) -> Result<TokenGrant> {
    let refresh: RefreshFields = read_fields(root.clone(), "refresh token")?;
    let refresh_token = refresh
        .refresh_token
        .or(refresh.access_token)
        .ok_or_else(|| {
            HubError::Schema("response has neither refresh_token nor access_token".to_string())
        })?;

    Ok(TokenGrant {
        refresh_token,
        access: parse_access_grant(root)?,
    })
}

/// Classifies one poll response.
pub fn parse_poll_response(body: &str) -> Result<PollOutcome> {
    let root = check_error(body)?;
    if is_pending(&root) {
        return Ok(PollOutcome::Pending);
    }
    parse_token_grant(root).map(PollOutcome::Granted)
}

fn read_fields<T: DeserializeOwned>(root: Value, what: &str) -> Result<T> {
    serde_json::from_value(root).map_err(|e| HubError::Schema(format!("invalid {what} response: {e}")))
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| HubError::Schema(format!("{field} must be a non-negative number of seconds, got {value}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_json_body_is_parse_error() {
        assert!(matches!(check_error("<html>"), Err(HubError::Parse(_))));
    }

    #[test]
    fn pending_is_not_an_error() {
        let root = check_error(r#"{"error":"authorization_pending"}"#).unwrap();
        assert!(is_pending(&root));
    }

    #[test]
    fn other_errors_are_protocol_errors() {
        let err = check_error(r#"{"error":"access_denied","error_description":"nope"}"#)
            .unwrap_err();
        match err {
            HubError::Protocol { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("nope"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn device_authorization_accepts_either_url_field() {
        let auth = parse_device_authorization(json!({
            "device_code": "D1",
            "user_code": "U1",
            "verification_uri": "http://x/v",
            "expires_in": 5,
            "interval": 1
        }))
        .unwrap();

        assert_eq!(auth.device_code(), "D1");
        assert_eq!(auth.user_code(), "U1");
        assert_eq!(auth.verification_url(), "http://x/v");
        assert_eq!(auth.expires_in(), Duration::from_secs(5));
        assert_eq!(auth.interval(), Duration::from_secs(1));
    }

    #[test]
    fn device_authorization_accepts_fractional_seconds() {
        let auth = parse_device_authorization(json!({
            "device_code": "D1",
            "user_code": "U1",
            "verification_url": "http://x/v",
            "expires_in": 1800.0,
            "interval": 2.5
        }))
        .unwrap();

        assert_eq!(auth.interval(), Duration::from_millis(2500));
    }

    #[test]
    fn device_authorization_interval_defaults_to_five_seconds() {
        let auth = parse_device_authorization(json!({
            "device_code": "D1",
            "user_code": "U1",
            "verification_url": "http://x/v",
            "expires_in": 900
        }))
        .unwrap();

        assert_eq!(auth.interval(), Duration::from_secs(5));
    }

    #[test]
    fn device_authorization_missing_field_is_schema_error() {
        let result = parse_device_authorization(json!({
            "device_code": "D1",
            "verification_url": "http://x/v",
            "expires_in": 5,
            "interval": 1
        }));
        assert!(matches!(result, Err(HubError::Schema(_))));
    }

    #[test]
    fn negative_interval_is_schema_error() {
        let result = parse_device_authorization(json!({
            "device_code": "D1",
            "user_code": "U1",
            "verification_url": "http://x/v",
            "expires_in": 5,
            "interval": -1
        }));
        assert!(matches!(result, Err(HubError::Schema(_))));
    }

    #[test]
    fn bearer_token_type_is_case_insensitive() {
        for token_type in ["Bearer", "bearer", "BEARER"] {
            let grant = parse_access_grant(json!({
                "access_token": "A1",
                "token_type": token_type,
                "scope": "repo"
            }))
            .unwrap();
            assert_eq!(grant.access_token.secret(), "A1");
            assert!(grant.expires_in.is_none());
        }
    }

    #[test]
    fn mac_token_type_is_rejected() {
        let result = parse_access_grant(json!({
            "access_token": "A1",
            "token_type": "mac",
            "scope": "repo"
        }));
        assert!(matches!(result, Err(HubError::UnsupportedTokenType(t)) if t == "mac"));
    }

    #[test]
    fn token_grant_prefers_refresh_token() {
        let grant = parse_token_grant(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "token_type": "Bearer",
            "scope": "",
            "expires_in": 3600
        }))
        .unwrap();

        assert_eq!(grant.refresh_token, "R1");
        assert_eq!(grant.access.access_token.secret(), "A1");
        assert_eq!(grant.access.expires_in, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn token_grant_falls_back_to_access_token() {
        let grant = parse_token_grant(json!({
            "access_token": "gho_abc",
            "token_type": "bearer",
            "scope": "repo"
        }))
        .unwrap();

        assert_eq!(grant.refresh_token, "gho_abc");
    }

    #[test]
    fn token_grant_without_tokens_is_schema_error() {
        let result = parse_token_grant(json!({ "token_type": "Bearer", "scope": "" }));
        assert!(matches!(result, Err(HubError::Schema(_))));
    }

    #[test]
    fn poll_response_classification() {
        assert!(matches!(
            parse_poll_response(r#"{"error":"authorization_pending"}"#),
            Ok(PollOutcome::Pending)
        ));
        assert!(matches!(
            parse_poll_response(r#"{"error":"expired_token"}"#),
            Err(HubError::Protocol { .. })
        ));
        assert!(matches!(
            parse_poll_response(
                r#"{"access_token":"A1","refresh_token":"R1","token_type":"Bearer","scope":""}"#
            ),
            Ok(PollOutcome::Granted(_))
        ));
    }
}
