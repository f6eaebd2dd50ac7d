mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use reltrack_config::Config;
use reltrack_source::{GitHubSource, SourceHandle};
use reltrack_store::Database;
use reltrack_tracker::Tracker;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
    }
    let db = Database::connect(&config.database, config.max_connections)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let source: SourceHandle = Arc::new(
        GitHubSource::new(&config.github.api_url, &config.github.user_agent, config.github.timeout())
            .or_raise(|| ErrorKind::Source)?
            .with_token(config.github.token.clone()),
    );
    let tracker = Tracker::new(db.store(), source);

    let result = run(&tracker, cli.command).await;
    db.close().await;
    result
}

async fn run(tracker: &Tracker, command: Command) -> Result<()> {
    match command {
        Command::List => print_json(&tracker.list_repositories().await.or_raise(|| ErrorKind::Tracker)?),
        Command::Add { repository, name } => {
            let (owner, name) = cli::parse_target(&repository, name.as_deref())?;
            let view = tracker.add_repository(&owner, &name).await.or_raise(|| ErrorKind::Tracker)?;
            print_json(&view)
        },
        Command::Refresh { id: Some(id), .. } => {
            print_json(&tracker.refresh(id).await.or_raise(|| ErrorKind::Tracker)?)
        },
        Command::Refresh { id: None, .. } => refresh_all(tracker).await,
        Command::Seen { id } => {
            if tracker.mark_as_seen(id).await.or_raise(|| ErrorKind::Tracker)? {
                println!("toggled seen flag of repository {id}");
            } else {
                println!("repository {id} has no releases");
            }
            Ok(())
        },
        Command::Remove { id } => {
            match tracker.remove_repository(id).await.or_raise(|| ErrorKind::Tracker)? {
                Some(id) => println!("removed repository {id}"),
                None => println!("repository {id} is not tracked"),
            }
            Ok(())
        },
    }
}

/// Refresh every tracked repository one after another. A failure is logged
/// and counted, and the remaining repositories are still refreshed.
async fn refresh_all(tracker: &Tracker) -> Result<()> {
    let repositories = tracker.list_repositories().await.or_raise(|| ErrorKind::Tracker)?;
    let mut refreshed = Vec::with_capacity(repositories.len());
    let mut failed = 0;
    for repository in repositories {
        match tracker.refresh(repository.id).await {
            Ok(refresh) => refreshed.push(refresh),
            Err(err) => {
                failed += 1;
                tracing::error!(
                    id = %repository.id,
                    owner = %repository.owner,
                    name = %repository.name,
                    retryable = err.is_retryable(),
                    "Refresh failed: {err:?}"
                );
            },
        }
    }
    print_json(&refreshed)?;
    if failed > 0 {
        exn::bail!(ErrorKind::PartialRefresh(failed));
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)
}
