//! Command implementations.

pub mod auth;
pub mod stats;

pub use auth::{handle_login, handle_logout, handle_status, handle_token};
pub use stats::{handle_releases, handle_repos};

/// Handle the `hubstats completions` command.
pub fn handle_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = crate::cli::Cli::command();
    generate(shell, &mut cmd, "hubstats", &mut std::io::stdout());
}
