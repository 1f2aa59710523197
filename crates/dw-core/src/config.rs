//! Configuration structures for dirwatch.
//!
//! - [`WatchConfig`] - What to watch (root directory, filter, recursion)
//! - [`Config`] - Root configuration, loadable from a JSON file
//!
//! Every struct is `#[serde(default)]`, so a config file only needs the
//! fields it wants to override.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Filter pattern that matches every file name.
pub const DEFAULT_FILTER: &str = "*";

/// Configuration for a single directory watch.
///
/// # Examples
///
/// ```
/// use dw_core::WatchConfig;
///
/// let config = WatchConfig::new("/tmp/watched").with_filter("*.txt");
/// assert_eq!(config.filter, "*.txt");
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory whose subtree is observed.
    pub root_path: Utf8PathBuf,

    /// Glob matched against file names. `"*"` matches everything.
    pub filter: String,

    /// Whether subdirectories are watched as well.
    pub recursive: bool,
}

impl WatchConfig {
    /// Creates a recursive, match-all configuration for `root_path`.
    #[must_use]
    pub fn new(root_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Sets the filter pattern.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets whether subdirectories are watched.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Checks that `root_path` names an existing directory.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidPath`] if the path is empty or not a directory
    /// - [`ConfigError::MissingDirectory`] if nothing exists at the path
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_path.as_str().is_empty() {
            return Err(ConfigError::InvalidPath {
                path: self.root_path.clone(),
                reason: "root path is empty".to_owned(),
            });
        }

        if !self.root_path.exists() {
            return Err(ConfigError::MissingDirectory(self.root_path.clone()));
        }

        if !self.root_path.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: self.root_path.clone(),
                reason: "not a directory".to_owned(),
            });
        }

        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root_path: Utf8PathBuf::new(),
            filter: DEFAULT_FILTER.to_owned(),
            recursive: true,
        }
    }
}

/// Root configuration for dirwatch.
///
/// # Examples
///
/// ```
/// use dw_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"watch": {"filter": "*.log"}}"#)?;
/// assert_eq!(config.watch.filter, "*.log");
/// assert!(config.watch.recursive);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory watch configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
