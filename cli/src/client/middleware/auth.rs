//! Authentication middleware for injecting Bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Error, Middleware, Next, Result};

use crate::auth::OAuth2Client;

/// Middleware that injects a fresh Bearer token into each request.
///
/// The token comes from [`OAuth2Client::access_token`], which reuses the
/// cached token until it expires. A request is never sent without one.
pub struct AuthMiddleware {
    oauth: Arc<OAuth2Client>,
}

impl AuthMiddleware {
    /// Create a new authentication middleware.
    #[must_use]
    pub fn new(oauth: Arc<OAuth2Client>) -> Self {
        Self { oauth }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let token = self
            .oauth
            .access_token()
            .await
            .map_err(|e| Error::Middleware(anyhow::Error::new(e)))?;

        let value = format!("Bearer {token}")
            .parse::<http::HeaderValue>()
            .map_err(|e| Error::Middleware(e.into()))?;
        req.headers_mut().insert(http::header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest_middleware::ClientBuilder;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::flow::{Credentials, FlowConfig};
    use crate::auth::prompt::MockPrompter;
    use crate::auth::transport::MockTransport;
    use crate::error::HubError;

    fn oauth(transport: MockTransport) -> Arc<OAuth2Client> {
        let flow = FlowConfig::new(
            Url::parse("https://auth.example.com/device").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
            Url::parse("https://auth.example.com/token").unwrap(),
        );
        Arc::new(OAuth2Client::new(
            Credentials::new("id", "secret"),
            flow,
            transport,
            MockPrompter::new(),
        ))
    }

    #[tokio::test]
    async fn injects_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut transport = MockTransport::new();
        transport.expect_post_form().times(1).returning(|_, _| {
            Ok(json!({
                "access_token": "A1",
                "token_type": "bearer",
                "scope": "repo",
                "expires_in": 3600
            })
            .to_string())
        });
        let oauth = oauth(transport);
        oauth.set_refresh_token("R1").await;

        let client = ClientBuilder::new(reqwest::Client::new())
            .with(AuthMiddleware::new(oauth))
            .build();

        for _ in 0..2 {
            let response = client
                .get(format!("{}/user", server.uri()))
                .timeout(Duration::from_secs(5))
                .send()
                .await
                .unwrap();
            assert!(response.status().is_success());
        }
    }

    #[tokio::test]
    async fn missing_token_aborts_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut transport = MockTransport::new();
        transport.expect_post_form().never();
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(AuthMiddleware::new(oauth(transport)))
            .build();

        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(matches!(HubError::from(err), HubError::NotAuthenticated));
    }
}
