//! Authentication command handlers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::credentials::StoredCredentials;
use crate::auth::{
    credentials_from_settings, AuthState, ConsolePrompter, CredentialStore, FlowConfig,
    HttpTransport, OAuth2Client,
};
use crate::cli::FlowOverrides;
use crate::config::{load_config, HubConfig};
use crate::error::{HubError, Result};

/// Builds an OAuth client from configuration.
///
/// Ctrl-C cancels any interactive wait the client is in.
pub(crate) fn oauth_client(
    config: &HubConfig,
    overrides: FlowOverrides,
    use_browser: bool,
) -> Result<OAuth2Client> {
    let mut settings = config.oauth.clone();
    // Overrides may supply the credentials the config file lacks.
    if overrides.client_id.is_some() {
        settings.client_id.clone_from(&overrides.client_id);
    }
    if overrides.client_secret.is_some() {
        settings.client_secret.clone_from(&overrides.client_secret);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut client = OAuth2Client::new(
        credentials_from_settings(&settings)?,
        FlowConfig::from_settings(&settings)?,
        HttpTransport::new(Duration::from_secs(config.api.timeout_secs))?,
        ConsolePrompter::new(use_browser),
    )
    .with_cancellation(cancel);
    overrides.apply(&mut client);

    Ok(client)
}

/// Handle the `hubstats auth login` command.
pub async fn handle_login(no_browser: bool, force: bool, overrides: FlowOverrides) -> Result<()> {
    let config = load_config()?;
    let store = CredentialStore::new()?;

    let stored = if force { None } else { store.load()? };
    let candidate = stored.map(|s| s.refresh_token).unwrap_or_default();

    let client = oauth_client(&config, overrides.clone(), !no_browser)?;
    let mut states = client.subscribe_state();
    tokio::spawn(async move {
        let mut waiting = false;
        while states.changed().await.is_ok() {
            match *states.borrow_and_update() {
                AuthState::PollingOrWaiting => waiting = true,
                AuthState::Authorized if waiting => {
                    println!("Authorization received!");
                    break;
                },
                _ => {},
            }
        }
    });

    if client.flow().is_limited_input() {
        println!("Authorizing with the device flow...");
    } else {
        println!("Authorizing in the browser...");
    }
    println!();

    let refresh_token = client.ensure_refresh_token(&candidate).await?;
    tracing::debug!(state = %client.state(), "Login finished");
    if refresh_token == candidate {
        println!("Already logged in. Use 'hubstats auth login --force' to authorize again.");
        return Ok(());
    }

    store.save(&credentials_to_store(refresh_token, &overrides))?;

    println!();
    println!("Successfully logged in!");
    if let (Some(scope), _) = client.access_token_info().await {
        println!("  Scopes: {}", if scope.is_empty() { "(none)" } else { scope.as_str() });
    }

    Ok(())
}

/// Handle the `hubstats auth logout` command.
pub async fn handle_logout() -> Result<()> {
    let store = CredentialStore::new()?;

    if store.has_credentials() {
        store.delete()?;
        println!("Successfully logged out.");
    } else {
        println!("Not currently logged in.");
    }

    Ok(())
}

/// Handle the `hubstats auth status` command.
pub async fn handle_status() -> Result<()> {
    let config = load_config()?;
    let store = CredentialStore::new()?;

    if let Some(stored) = store.load()? {
        println!("Logged in");
        println!();
        println!("  Authorized: {}", stored.saved_at.format("%Y-%m-%d %H:%M UTC"));
        println!("  Token file: {}", store.path().display());
        if let Some(token_url) = &stored.token_url {
            println!("  Token URL:  {token_url}");
        }
        println!("  API Server: {}", config.api.base_url);
        println!(
            "  Flow:       {}",
            if config.oauth.redirect_uri.is_empty() {
                "device"
            } else {
                "authorization code"
            }
        );
    } else {
        println!("Not logged in");
        println!();
        println!("Run 'hubstats auth login' to authenticate.");
    }

    Ok(())
}

/// Handle the `hubstats auth token` command.
pub async fn handle_token() -> Result<()> {
    let config = load_config()?;
    let client = authorized_client(&config).await?;

    println!("{}", client.access_token().await?);
    Ok(())
}

/// OAuth client holding the stored refresh token.
pub(crate) async fn authorized_client(config: &HubConfig) -> Result<OAuth2Client> {
    let stored = CredentialStore::new()?
        .load()?
        .ok_or(HubError::NotAuthenticated)?;

    let client = oauth_client(config, refresh_overrides(&stored)?, false)?;
    client.set_refresh_token(&stored.refresh_token).await;
    Ok(client)
}

/// The refresh token plus the login overrides a later refresh depends on.
fn credentials_to_store(refresh_token: String, overrides: &FlowOverrides) -> StoredCredentials {
    StoredCredentials {
        client_id: overrides.client_id.clone(),
        client_secret: overrides.client_secret.clone(),
        token_url: overrides.token_url.as_ref().map(Url::to_string),
        ..StoredCredentials::new(refresh_token)
    }
}

fn refresh_overrides(stored: &StoredCredentials) -> Result<FlowOverrides> {
    Ok(FlowOverrides {
        client_id: stored.client_id.clone(),
        client_secret: stored.client_secret.clone(),
        token_url: stored.token_url.as_deref().map(Url::parse).transpose()?,
        ..FlowOverrides::default()
    })
}
