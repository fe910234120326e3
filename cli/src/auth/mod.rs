//! OAuth 2.0 authentication for hubstats.
//!
//! [`OAuth2Client`] obtains a refresh token through either the device flow
//! or the authorization-code flow, then mints access tokens from it.
//! [`CredentialStore`] keeps the refresh token between runs.

pub mod client;
mod code_flow;
pub mod credentials;
pub mod device_flow;
pub mod flow;
pub mod form;
pub mod poll;
pub mod prompt;
pub mod redirect;
pub mod response;
pub mod tokens;
pub mod transport;

pub use client::OAuth2Client;
pub use credentials::CredentialStore;
pub use flow::{credentials_from_settings, FlowConfig};
pub use prompt::ConsolePrompter;
pub use tokens::AuthState;
pub use transport::HttpTransport;
