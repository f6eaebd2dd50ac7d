use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser, Subcommand};
use reltrack_tracker::RepositoryId;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reltrack", version, about = "Track GitHub releases and remember which ones you've seen")]
pub struct Cli {
    /// Read configuration from this file instead of the platform config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "reltrack=info",
            1 => "reltrack=debug",
            _ => "reltrack=trace",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tracked repositories with their latest release.
    List,
    /// Start tracking a repository.
    Add {
        /// `owner/name`, or just the owner when the name is given separately.
        repository: String,
        name: Option<String>,
    },
    /// Fetch the latest release of tracked repositories.
    Refresh {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<RepositoryId>,
        /// Refresh every tracked repository, continuing past failures.
        #[arg(long)]
        all: bool,
    },
    /// Toggle the seen flag of a repository's latest release.
    Seen { id: RepositoryId },
    /// Stop tracking a repository.
    Remove { id: RepositoryId },
}

/// Split an `add` target into owner and name.
pub fn parse_target(repository: &str, name: Option<&str>) -> Result<(String, String)> {
    let (owner, name) = match name {
        Some(name) => (repository, name),
        None => repository
            .split_once('/')
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidTarget(repository.to_string())))?,
    };
    let valid = |part: &str| !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace);
    if !valid(owner) || !valid(name) {
        exn::bail!(ErrorKind::InvalidTarget(repository.to_string()));
    }
    Ok((owner.to_string(), name.to_string()))
}
