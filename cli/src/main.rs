//! Hubstats - GitHub repository and release statistics
//!
//! Hubstats authorizes against GitHub with OAuth 2.0, keeps the refresh
//! token between runs, and reports stars, forks and release downloads.

mod auth;
mod cli;
mod client;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AuthCommands, Cli, Commands};
use crate::config::settings::env;
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        if e.is_retriable() {
            eprintln!("This looks temporary; try again in a moment.");
        }
        std::process::exit(if e.requires_reauth() { 2 } else { 1 });
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                no_browser,
                force,
                overrides,
            } => cli::commands::handle_login(no_browser, force, overrides).await,
            AuthCommands::Logout => cli::commands::handle_logout().await,
            AuthCommands::Status => cli::commands::handle_status().await,
            AuthCommands::Token => cli::commands::handle_token().await,
        },
        Commands::Repos { user } => cli::commands::handle_repos(&user).await,
        Commands::Releases { owner, repo } => cli::commands::handle_releases(&owner, &repo).await,
        Commands::Completions { shell } => {
            cli::commands::handle_completions(shell);
            Ok(())
        },
    }
}
