//! Request bodies and URLs sent to the OAuth server.
//!
//! Bodies are `application/x-www-form-urlencoded` pairs. Values are
//! percent-encoded by the transport, so secrets or scopes containing `&`
//! or `=` cannot corrupt a request.

use url::Url;

use crate::auth::flow::{Credentials, FlowConfig};

/// Ordered form fields for one request.
pub type Form = Vec<(&'static str, String)>;

/// Fields that start an authorization: the device-code request body, or
/// the browser authorization query.
pub fn authorization_request(credentials: &Credentials, flow: &FlowConfig, state: Option<&str>) -> Form {
    let mut form: Form = vec![("client_id", credentials.client_id.as_str().to_owned())];

    if !flow.scope.is_empty() {
        form.push(("scope", flow.scope.clone()));
    }
    if !flow.login_hint.is_empty() {
        form.push(("login_hint", flow.login_hint.clone()));
    }
    if !flow.response_type.is_empty() {
        form.push(("response_type", flow.response_type.clone()));
    }
    if let Some(redirect_uri) = &flow.redirect_uri {
        form.push(("redirect_uri", redirect_uri.to_string()));
    }
    if let Some(state) = state.filter(|s| !s.is_empty()) {
        form.push(("state", state.to_string()));
    }

    form
}

/// Browser URL for the authorization-code flow.
pub fn authorization_url(credentials: &Credentials, flow: &FlowConfig, state: Option<&str>) -> Url {
    let mut url = flow.authorization_url.clone();
    url.query_pairs_mut()
        .extend_pairs(authorization_request(credentials, flow, state));
    url
}

/// Device-code poll body.
pub fn device_poll_request(credentials: &Credentials, flow: &FlowConfig, device_code: &str) -> Form {
    let mut form = client_authentication(credentials);
    form.push(("device_code", device_code.to_string()));
    form.push(("grant_type", flow.poll_grant_type().to_string()));
    form
}

/// Authorization-code exchange body.
pub fn code_exchange_request(credentials: &Credentials, flow: &FlowConfig, code: &str) -> Form {
    let mut form = client_authentication(credentials);
    form.push(("code", code.to_string()));
    form.push(("grant_type", flow.grant_type.clone()));
    if let Some(redirect_uri) = &flow.redirect_uri {
        form.push(("redirect_uri", redirect_uri.to_string()));
    }
    form
}

/// Refresh-token grant body.
pub fn refresh_request(credentials: &Credentials, refresh_token: &str) -> Form {
    let mut form = client_authentication(credentials);
    form.push(("refresh_token", refresh_token.to_string()));
    form.push(("grant_type", "refresh_token".to_string()));
    form
}

fn client_authentication(credentials: &Credentials) -> Form {
    vec![
        ("client_id", credentials.client_id.as_str().to_owned()),
        ("client_secret", credentials.client_secret.secret().clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("my-id", "my&secret")
    }

    fn flow() -> FlowConfig {
        FlowConfig::new(
            Url::parse("https://auth.example.com/device").unwrap(),
            Url::parse("https://auth.example.com/poll").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        )
    }

    fn keys(form: &Form) -> Vec<&'static str> {
        form.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn authorization_request_skips_empty_optionals() {
        let form = authorization_request(&creds(), &flow(), None);
        assert_eq!(form, vec![("client_id", "my-id".to_string())]);
    }

    #[test]
    fn authorization_request_orders_all_fields() {
        let mut f = flow();
        f.scope = "repo read:user".to_string();
        f.login_hint = "octocat".to_string();
        f.response_type = "code".to_string();
        f.redirect_uri = Some(Url::parse("http://localhost:8080/cb").unwrap());

        let form = authorization_request(&creds(), &f, Some("k3y"));
        assert_eq!(
            keys(&form),
            vec!["client_id", "scope", "login_hint", "response_type", "redirect_uri", "state"]
        );
        assert_eq!(form[5].1, "k3y");
    }

    #[test]
    fn authorization_url_percent_encodes_values() {
        let mut f = flow();
        f.scope = "a&b c".to_string();

        let url = authorization_url(&creds(), &f, None);
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/device?client_id=my-id&scope=a%26b+c"
        );
    }

    #[test]
    fn device_poll_uses_poll_grant_type() {
        let form = device_poll_request(&creds(), &flow(), "D1");
        assert_eq!(
            form,
            vec![
                ("client_id", "my-id".to_string()),
                ("client_secret", "my&secret".to_string()),
                ("device_code", "D1".to_string()),
                (
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:device_code".to_string()
                ),
            ]
        );
    }

    #[test]
    fn code_exchange_includes_redirect_uri() {
        let mut f = flow();
        f.redirect_uri = Some(Url::parse("http://127.0.0.1:9000/").unwrap());

        let form = code_exchange_request(&creds(), &f, "C1");
        assert_eq!(
            keys(&form),
            vec!["client_id", "client_secret", "code", "grant_type", "redirect_uri"]
        );
        assert_eq!(form[3].1, "authorization_code");
        assert_eq!(form[4].1, "http://127.0.0.1:9000/");
    }

    #[test]
    fn refresh_request_uses_refresh_grant() {
        let form = refresh_request(&creds(), "R1");
        assert_eq!(form[2], ("refresh_token", "R1".to_string()));
        assert_eq!(form[3], ("grant_type", "refresh_token".to_string()));
    }
}
