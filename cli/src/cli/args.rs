//! Command-line argument parsing.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use url::Url;

use crate::auth::OAuth2Client;

/// GitHub repository and release statistics.
///
/// Hubstats authorizes against GitHub with OAuth 2.0 (device flow by
/// default, or a browser redirect to a local port) and reports stars,
/// forks and release download counts.
#[derive(Parser, Debug)]
#[command(name = "hubstats")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage authentication.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Show star, fork and issue counts for a user's repositories.
    Repos {
        /// GitHub user or organization.
        user: String,
    },

    /// Show download counts for a repository's releases.
    Releases {
        /// Repository owner.
        owner: String,

        /// Repository name.
        repo: String,
    },

    /// Generate shell completion scripts.
    ///
    /// Outputs completion script for the specified shell.
    /// Follow shell-specific instructions to install.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Authentication subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Authorize hubstats with GitHub using OAuth.
    Login {
        /// Skip opening the browser automatically.
        #[arg(long)]
        no_browser: bool,

        /// Authorize again even if a refresh token is stored.
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        overrides: FlowOverrides,
    },

    /// Log out and remove the stored refresh token.
    Logout,

    /// Show current authentication status.
    Status,

    /// Print a fresh access token to stdout.
    Token,
}

/// One-off overrides of the `[oauth]` configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct FlowOverrides {
    /// OAuth client id.
    #[arg(long, env = "HUBSTATS_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[arg(long, env = "HUBSTATS_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Device or browser authorization endpoint.
    #[arg(long)]
    pub authorization_url: Option<Url>,

    /// Device-flow polling endpoint.
    #[arg(long)]
    pub poll_url: Option<Url>,

    /// Token endpoint for code exchange and refresh.
    #[arg(long)]
    pub token_url: Option<Url>,

    /// Space-separated scopes to request.
    #[arg(long)]
    pub scope: Option<String>,

    /// Account hint passed to the authorization server.
    #[arg(long)]
    pub login_hint: Option<String>,

    /// Redirect URI; selects the browser authorization-code flow.
    #[arg(long)]
    pub redirect_uri: Option<Url>,

    #[arg(long)]
    pub response_type: Option<String>,

    #[arg(long)]
    pub grant_type: Option<String>,

    #[arg(long)]
    pub device_grant_type: Option<String>,

    /// Text shown in the browser after a successful redirect.
    #[arg(long)]
    pub success_message: Option<String>,
}

impl FlowOverrides {
    /// Applies every override that was given.
    pub fn apply(self, client: &mut OAuth2Client) {
        if let Some(v) = self.client_id {
            client.set_client_id(v);
        }
        if let Some(v) = self.client_secret {
            client.set_client_secret(v);
        }
        if let Some(v) = self.authorization_url {
            client.set_authorization_url(v);
        }
        if let Some(v) = self.poll_url {
            client.set_poll_url(v);
        }
        if let Some(v) = self.token_url {
            client.set_token_url(v);
        }
        if let Some(v) = self.scope {
            client.set_scope(v);
        }
        if let Some(v) = self.login_hint {
            client.set_login_hint(v);
        }
        if let Some(v) = self.redirect_uri {
            client.set_redirect_uri(Some(v));
        }
        if let Some(v) = self.response_type {
            client.set_response_type(v);
        }
        if let Some(v) = self.grant_type {
            client.set_grant_type(v);
        }
        if let Some(v) = self.device_grant_type {
            client.set_device_grant_type(v);
        }
        if let Some(v) = self.success_message {
            client.set_success_message(v);
        }
    }
}
