//! Repository and release statistics.

use std::sync::Arc;

use crate::cli::commands::auth::authorized_client;
use crate::client::GitHubClient;
use crate::config::load_config;
use crate::error::Result;

async fn github() -> Result<GitHubClient> {
    let config = load_config()?;
    let oauth = authorized_client(&config).await?;
    let github = GitHubClient::new(&config.api, Arc::new(oauth))?;
    tracing::debug!(api = %github.base_url(), "Using GitHub API");
    Ok(github)
}

/// Handle the `hubstats repos` command.
pub async fn handle_repos(user: &str) -> Result<()> {
    let github = github().await?;
    let mut repos = github.user_repos(user).await?;

    if repos.is_empty() {
        println!("No public repositories for {user}.");
        return Ok(());
    }

    repos.sort_by(|a, b| {
        b.stargazers_count
            .cmp(&a.stargazers_count)
            .then_with(|| a.name.cmp(&b.name))
    });

    let names: Vec<String> = repos
        .iter()
        .map(|r| {
            if r.fork {
                format!("{} (fork)", r.name)
            } else {
                r.name.clone()
            }
        })
        .collect();
    let width = names.iter().map(String::len).max().unwrap_or(0);

    println!(
        "{:<width$}  {:<12}  {:>7}  {:>6}  {:>6}",
        "REPOSITORY", "LANGUAGE", "STARS", "FORKS", "ISSUES"
    );
    for (name, repo) in names.iter().zip(&repos) {
        println!(
            "{name:<width$}  {:<12}  {:>7}  {:>6}  {:>6}",
            repo.language.as_deref().unwrap_or("-"),
            repo.stargazers_count,
            repo.forks_count,
            repo.open_issues_count
        );
    }

    let stars: u64 = repos.iter().map(|r| r.stargazers_count).sum();
    let forks: u64 = repos.iter().map(|r| r.forks_count).sum();
    println!();
    println!("{} repositories, {stars} stars, {forks} forks", repos.len());

    Ok(())
}

/// Handle the `hubstats releases` command.
pub async fn handle_releases(owner: &str, repo: &str) -> Result<()> {
    let github = github().await?;
    let releases = github.releases(owner, repo).await?;

    if releases.is_empty() {
        println!("{owner}/{repo} has no releases.");
        return Ok(());
    }

    let width = releases.iter().map(|r| r.tag_name.len()).max().unwrap_or(0);
    println!("{:<width$}  {:<10}  {:>10}", "TAG", "PUBLISHED", "DOWNLOADS");
    for release in &releases {
        let published = release
            .published_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        let marker = if release.draft {
            " (draft)"
        } else if release.prerelease {
            " (pre)"
        } else {
            ""
        };
        println!(
            "{:<width$}  {published:<10}  {:>10}{marker}",
            release.tag_name,
            release.download_count()
        );
        tracing::debug!(tag = %release.tag_name, name = ?release.name, assets = release.assets.len());
        for asset in &release.assets {
            tracing::debug!(asset = %asset.name, size = asset.size, downloads = asset.download_count);
        }
    }

    let total: u64 = releases.iter().map(|r| r.download_count()).sum();
    println!();
    println!("{} releases, {total} downloads", releases.len());

    Ok(())
}
