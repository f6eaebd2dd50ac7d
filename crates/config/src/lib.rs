//! Layered configuration for reltrack.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults,
//! 2. `GITHUB_TOKEN` (only as `github.token`),
//! 3. `config.toml` then `config.yaml` from the platform config directory, or
//!    a single explicitly requested file,
//! 4. `RELTRACK_`-prefixed environment variables, with `__` separating
//!    nested keys (`RELTRACK_GITHUB__TOKEN`, `RELTRACK_DATABASE`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use reltrack_source::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APPLICATION: &str = "reltrack";
const DATABASE_FILE: &str = "reltrack.sqlite";
const ENV_PREFIX: &str = "RELTRACK_";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// Connection pool size; the store picks a small default when unset.
    pub max_connections: Option<u32>,
    pub github: GitHubConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: 30,
            user_agent: concat!("reltrack/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Defaults, with the database placed inside `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            database: data_dir.join(DATABASE_FILE),
            max_connections: None,
            github: GitHubConfig::default(),
        }
    }

    /// Load configuration for the current user.
    ///
    /// With `explicit` set, that file replaces the platform config files and
    /// must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", APPLICATION).ok_or_raise(|| ErrorKind::Directories)?;
        let files = match explicit {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::MissingFile(path.to_path_buf())),
            Some(path) => vec![path.to_path_buf()],
            None => vec![dirs.config_dir().join("config.toml"), dirs.config_dir().join("config.yaml")],
        };
        let config: Self = figment(dirs.data_dir(), &files).extract().or_raise(|| ErrorKind::Load)?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }
}

/// The merged configuration sources, before extraction.
///
/// Missing files are skipped. The format of each file is chosen by its
/// extension; anything that isn't YAML is read as TOML.
pub fn figment(data_dir: &Path, files: &[PathBuf]) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::with_data_dir(data_dir)))
        .merge(Env::raw().only(&["GITHUB_TOKEN"]).map(|_| "github.token".into()));
    for file in files {
        if file.is_file() {
            tracing::debug!(path = %file.display(), "Reading configuration file");
        }
        figment = match file.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
            _ => figment.merge(Toml::file(file)),
        };
    }
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn extract(jail: &Jail, files: &[&str]) -> figment::Result<Config> {
        let files: Vec<PathBuf> = files.iter().map(|f| jail.directory().join(f)).collect();
        figment(jail.directory(), &files).extract()
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = extract(jail, &["config.toml"])?;
            assert_eq!(config.database, jail.directory().join("reltrack.sqlite"));
            assert_eq!(config.max_connections, None);
            assert_eq!(config.github.api_url, DEFAULT_API_URL);
            assert_eq!(config.github.token, None);
            assert_eq!(config.github.timeout(), Duration::from_secs(30));
            assert!(config.github.user_agent.starts_with("reltrack/"));
            Ok(())
        });
    }

    #[rstest]
    #[case("config.toml", "database = \"/var/lib/reltrack.db\"\n[github]\ntimeout_secs = 5\n")]
    #[case("config.yaml", "database: /var/lib/reltrack.db\ngithub:\n  timeout_secs: 5\n")]
    #[case("config.yml", "database: /var/lib/reltrack.db\ngithub:\n  timeout_secs: 5\n")]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(name, contents)?;
            let config = extract(jail, &[name])?;
            assert_eq!(config.database, PathBuf::from("/var/lib/reltrack.db"));
            assert_eq!(config.github.timeout_secs, 5);
            assert_eq!(config.github.api_url, DEFAULT_API_URL);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "max_connections = 2\n[github]\napi_url = \"https://ghe.example.com\"\n")?;
            jail.set_env("RELTRACK_MAX_CONNECTIONS", 8);
            jail.set_env("RELTRACK_GITHUB__API_URL", "https://api.example.com");
            jail.set_env("RELTRACK_DATABASE", "/tmp/other.sqlite");
            let config = extract(jail, &["config.toml"])?;
            assert_eq!(config.max_connections, Some(8));
            assert_eq!(config.github.api_url, "https://api.example.com");
            assert_eq!(config.database, PathBuf::from("/tmp/other.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_github_token_fallback() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GITHUB_TOKEN", "ghp_fallback");
            assert_eq!(extract(jail, &[])?.github.token.as_deref(), Some("ghp_fallback"));

            jail.create_file("config.toml", "[github]\ntoken = \"ghp_file\"\n")?;
            assert_eq!(extract(jail, &["config.toml"])?.github.token.as_deref(), Some("ghp_file"));

            jail.set_env("RELTRACK_GITHUB__TOKEN", "ghp_env");
            assert_eq!(extract(jail, &["config.toml"])?.github.token.as_deref(), Some("ghp_env"));
            Ok(())
        });
    }

    #[test]
    fn test_later_file_wins() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "max_connections = 2\n")?;
            jail.create_file("config.yaml", "max_connections: 3\n")?;
            assert_eq!(extract(jail, &["config.toml", "config.yaml"])?.max_connections, Some(3));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_fails() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("RELTRACK_GITHUB__TIMEOUT_SECS", "soon");
            assert!(extract(jail, &[]).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/reltrack.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(_) | ErrorKind::Directories));
    }

    #[test]
    fn test_token_is_redacted() {
        let github = GitHubConfig {
            token: Some("ghp_secret".to_string()),
            ..GitHubConfig::default()
        };
        let debug = format!("{:?}", Config {
            github,
            ..Config::with_data_dir(Path::new("/data"))
        });
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }
}
