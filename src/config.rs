//! Layered application configuration.
//!
//! Settings merge in increasing precedence:
//! defaults < `dupescout.toml` < `DUPESCOUT_*` environment variables <
//! CLI flags (applied by the caller after loading).

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dupescout.toml";

/// Environment variable prefix for overrides, e.g. `DUPESCOUT_IO_THREADS`.
pub const ENV_PREFIX: &str = "DUPESCOUT_";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Worker threads for parallel hashing.
    pub io_threads: usize,
    /// Minimum file size to scan (bytes).
    pub min_size: Option<u64>,
    /// Maximum file size to scan (bytes).
    pub max_size: Option<u64>,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Follow symbolic links during discovery.
    pub follow_symlinks: bool,
    /// Whether to call the category classifier at all.
    pub classify: bool,
    /// Classifier timeout in seconds; expiry degrades to default
    /// categories.
    pub classify_timeout_secs: u64,
    /// Override the official path patterns used by the recommender.
    pub official_patterns: Option<Vec<String>>,
    /// Override the transient path patterns used by the recommender.
    pub transient_patterns: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            min_size: None,
            max_size: None,
            skip_hidden: false,
            follow_symlinks: false,
            classify: true,
            classify_timeout_secs: 20,
            official_patterns: None,
            transient_patterns: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file, and
    /// environment variables.
    ///
    /// When `file` is `None`, `dupescout.toml` in the working directory is
    /// used if present; a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be parsed, or an
    /// environment override has the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let toml_provider = match file {
            Some(path) => Toml::file(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(toml_provider)
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("failed to load configuration")?;
        log::debug!("Loaded configuration: {config:?}");
        Ok(config)
    }

    /// Write a default config file for the user to edit.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_default(path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(&Self::default()).context("failed to serialize defaults")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Classifier timeout as a [`std::time::Duration`].
    #[must_use]
    pub fn classify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.classify_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.io_threads, 4);
        assert!(config.classify);
        assert_eq!(config.classify_timeout_secs, 20);
        assert!(config.official_patterns.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dupescout.toml");
        std::fs::write(&path, "io_threads = 8\nskip_hidden = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.io_threads, 8);
        assert!(config.skip_hidden);
        // Untouched keys keep their defaults.
        assert!(config.classify);
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dupescout.toml");
        Config::write_default(&path).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dupescout.toml");
        std::fs::write(&path, "io_threads = \"many\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
