//! GitHub REST API client.

pub mod api;
pub mod middleware;

pub use api::GitHubClient;
