//! OAuth 2.0 authorization-code grant.
//!
//! With a loopback redirect URI the browser hands the code to a one-shot
//! local listener; any other redirect URI falls back to the user pasting
//! the code into the terminal.

use oauth2::CsrfToken;
use url::{Host, Url};

use crate::auth::client::OAuth2Client;
use crate::auth::form;
use crate::auth::redirect::{self, LocalRedirectListener};
use crate::auth::response::{self, TokenGrant};
use crate::auth::tokens::AuthState;
use crate::error::{HubError, Result};

/// Host and port to listen on, if `uri` points back at this machine.
fn loopback_target(uri: &Url) -> Option<(String, u16)> {
    if uri.scheme() != "http" {
        return None;
    }
    let host = match uri.host()? {
        Host::Domain("localhost") => "localhost".to_string(),
        Host::Ipv4(ip) if ip.is_loopback() => ip.to_string(),
        _ => return None,
    };
    Some((host, uri.port_or_known_default()?))
}

impl OAuth2Client {
    /// Runs the authorization-code flow and exchanges the code for tokens.
    pub(crate) async fn run_code_flow(&self, redirect_uri: &Url) -> Result<TokenGrant> {
        let state = self.flow.send_state.then(CsrfToken::new_random);
        let auth_url = form::authorization_url(
            &self.credentials,
            &self.flow,
            state.as_ref().map(|s| s.secret().as_str()),
        );

        let code = match loopback_target(redirect_uri) {
            Some((host, port)) => {
                let listener = LocalRedirectListener::bind(&host, port).await?;
                tracing::debug!(addr = %listener.local_addr()?, "Waiting for browser redirect");
                if !self.prompter.open_browser(&auth_url) {
                    self.prompter.show_authorization_url(&auth_url);
                }
                self.transition(AuthState::PollingOrWaiting);

                let request = tokio::select! {
                    request = listener.capture(self.flow.redirect_timeout, &self.flow.success_message) => request?,
                    () = self.cancel.cancelled() => return Err(HubError::Cancelled),
                };

                if let Some(expected) = &state {
                    if redirect::extract_state(&request).as_deref() != Some(expected.secret().as_str()) {
                        return Err(HubError::protocol(
                            "state_mismatch",
                            Some("redirect did not carry the state sent with the request".to_string()),
                        ));
                    }
                }

                let code = redirect::extract_code(&request);
                if code.is_empty() {
                    tracing::warn!("Redirect did not contain an authorization code");
                }
                code
            },
            None => {
                self.prompter.show_authorization_url(&auth_url);
                self.transition(AuthState::PollingOrWaiting);
                self.prompter.read_authorization_code().await?
            },
        };

        tracing::debug!(url = %self.flow.token_url, "Exchanging authorization code");
        let body = self
            .transport
            .post_form(
                &self.flow.token_url,
                form::code_exchange_request(&self.credentials, &self.flow, &code),
            )
            .await?;
        response::parse_token_grant(response::check_error(&body)?)
    }
}
