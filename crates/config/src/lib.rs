//! Layered configuration for flightsearch.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults (paths under the platform data directory),
//! 2. a TOML file (explicit path, or `config.toml` in the platform config
//!    directory if it exists),
//! 3. `FLIGHTSEARCH_*` environment variables (`FLIGHTSEARCH_DEBOUNCE_MS=150`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "FLIGHTSEARCH_";
/// Anything slower than this stops feeling like search-as-you-type.
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "flightsearch")
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite catalog database (created and seeded on first run).
    pub database: PathBuf,
    /// JSON file holding the persisted preferences.
    pub preferences: PathBuf,
    /// Quiet period after the last keystroke before searching.
    pub debounce_ms: u64,
    /// `tracing` filter directive, used when `RUST_LOG` is not set.
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".flightsearch"));
        Self {
            database: data_dir.join("catalog.sqlite"),
            preferences: data_dir.join("preferences.json"),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            log: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from every source.
    ///
    /// An explicit `path` must exist; the implicit per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(path)?)
    }

    /// Build the provider stack without extracting it.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(dirs) = project_dirs() {
                    figment = figment.merge(Toml::file(dirs.config_dir().join(CONFIG_FILE_NAME)));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration from any provider stack.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            exn::bail!(ErrorKind::Invalid(format!(
                "debounce_ms must be at most {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            )));
        }
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database path is empty".to_string()));
        }
        if self.preferences.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("preferences path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_figment(defaults()).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.log, "info");
        assert!(config.database.ends_with("catalog.sqlite"));
        assert!(config.preferences.ends_with("preferences.json"));
    }

    #[test]
    fn test_file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "flightsearch.toml",
                r#"
                    database = "/tmp/flights.sqlite"
                    debounce_ms = 150
                "#,
            )?;
            jail.set_env("FLIGHTSEARCH_DEBOUNCE_MS", "75");
            let config = Config::load(Some(Path::new("flightsearch.toml"))).unwrap();
            assert_eq!(config.database, PathBuf::from("/tmp/flights.sqlite"));
            assert_eq!(config.debounce_ms, 75, "environment wins over the file");
            assert_eq!(config.log, "info", "unset keys keep their defaults");
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(p) if p == &path));
    }

    #[rstest]
    #[case("debounce_ms = 10001")]
    #[case("database = \"\"")]
    #[case("preferences = \"\"")]
    fn test_invalid_values_are_rejected(#[case] toml: &str) {
        let err = Config::from_figment(defaults().merge(Toml::string(toml))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_malformed_values_fail_to_load() {
        let err = Config::from_figment(defaults().merge(Toml::string("debounce_ms = \"fast\""))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case(0)]
    #[case(300)]
    #[case(MAX_DEBOUNCE_MS)]
    fn test_debounce_bounds(#[case] ms: u64) {
        let config = Config::from_figment(defaults().merge(Serialized::default("debounce_ms", ms))).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(ms));
    }
}
