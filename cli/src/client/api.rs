//! GitHub API client implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::OAuth2Client;
use crate::client::middleware::AuthMiddleware;
use crate::config::ApiConfig;
use crate::error::{HubError, Result};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const PER_PAGE: &str = "100";

/// A repository as listed by `users/{user}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub language: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub size: u64,
    pub download_count: u64,
}

/// A published or draft release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
}

impl ReleaseInfo {
    /// Downloads summed over all assets.
    pub fn download_count(&self) -> u64 {
        self.assets.iter().map(|a| a.download_count).sum()
    }
}

/// Client for the GitHub REST API.
///
/// Every request carries a bearer token from the shared [`OAuth2Client`];
/// transient failures are retried with exponential backoff.
pub struct GitHubClient {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl GitHubClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, oauth: Arc<OAuth2Client>) -> Result<Self> {
        let inner_client = Client::builder()
            .user_agent(format!("hubstats/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        // Build middleware stack
        let client = ClientBuilder::new(inner_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(AuthMiddleware::new(oauth))
            .build();

        Ok(Self {
            client,
            base_url: with_trailing_slash(config.base_url.clone()),
        })
    }

    /// Lists every public repository of `user`.
    pub async fn user_repos(&self, user: &str) -> Result<Vec<RepoInfo>> {
        self.get_all(&format!("users/{user}/repos")).await
    }

    /// Lists every release of `owner/repo`, newest first.
    pub async fn releases(&self, owner: &str, repo: &str) -> Result<Vec<ReleaseInfo>> {
        self.get_all(&format!("repos/{owner}/{repo}/releases")).await
    }

    /// Fetches `page=1,2,...` of a list endpoint until a page comes back empty.
    async fn get_all<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let url = self.base_url.join(endpoint)?;
        let mut items = Vec::new();

        for page in 1u32.. {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", PER_PAGE)
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = self.get_json(page_url).await?;
            if batch.is_empty() {
                break;
            }
            tracing::debug!(endpoint, page, count = batch.len(), "Fetched page");
            items.extend(batch);
        }

        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(http::header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(HubError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HubError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| HubError::Serialization(e.to_string()))
    }

    /// Get the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Endpoints are joined relative to the base, so its last segment must be a
/// directory (`https://ghe.example.com/api/v3/`).
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
