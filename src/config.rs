//! Configuration loading and management
//!
//! Handles parsing of the `config.toml` file found via `--config`, `TD_CONFIG`,
//! or the platform config directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::splitter::{SplitMode, DEFAULT_ENDPOINT};
use crate::task::{Category, Priority};
use crate::view::{SortMode, StatusFilter};

pub const CONFIG_FILE: &str = "config.toml";

/// Upper bound for the simulated splitter delay
pub const MAX_MOCK_DELAY_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Defaults applied to new tasks
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Default list view
    #[serde(default)]
    pub view: ViewConfig,

    /// AI splitter settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Notification sink
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_category() -> String {
    Category::default().as_str().to_string()
}

fn default_priority() -> String {
    Priority::default().as_str().to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            priority: default_priority(),
        }
    }
}

impl DefaultsConfig {
    pub fn category(&self) -> Result<Category> {
        self.category
            .parse()
            .map_err(|_| invalid_field("defaults.category", &self.category))
    }

    pub fn priority(&self) -> Result<Priority> {
        self.priority
            .parse()
            .map_err(|_| invalid_field("defaults.priority", &self.priority))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// all | active | completed
    #[serde(default = "default_status")]
    pub status: String,

    /// date | priority
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_status() -> String {
    StatusFilter::default().as_str().to_string()
}

fn default_sort() -> String {
    SortMode::default().as_str().to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            status: default_status(),
            sort: default_sort(),
        }
    }
}

impl ViewConfig {
    pub fn status(&self) -> Result<StatusFilter> {
        self.status
            .parse()
            .map_err(|_| invalid_field("view.status", &self.status))
    }

    pub fn sort(&self) -> Result<SortMode> {
        self.sort
            .parse()
            .map_err(|_| invalid_field("view.sort", &self.sort))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// mock | real
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_credential_env")]
    pub credential_env: String,

    #[serde(default = "default_mock_delay_ms")]
    pub mock_delay_ms: u64,
}

fn default_mode() -> String {
    SplitMode::default().as_str().to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_credential_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_mock_delay_ms() -> u64 {
    1500
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            endpoint: default_endpoint(),
            credential_env: default_credential_env(),
            mock_delay_ms: default_mock_delay_ms(),
        }
    }
}

impl AiConfig {
    pub fn mode(&self) -> Result<SplitMode> {
        self.mode
            .parse()
            .map_err(|_| invalid_field("ai.mode", &self.mode))
    }

    /// Read the credential from the configured environment variable.
    pub fn credential_from_env(&self) -> Option<String> {
        std::env::var(self.credential_env.trim())
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    fn validate(&self) -> Result<()> {
        self.mode()?;

        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "ai.endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.credential_env.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "ai.credential_env cannot be empty".to_string(),
            ));
        }
        if self.mock_delay_ms > MAX_MOCK_DELAY_MS {
            return Err(Error::InvalidConfig(format!(
                "ai.mock_delay_ms must be <= {MAX_MOCK_DELAY_MS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// "" disables, "-" writes to stdout, anything else is a file path
    #[serde(default)]
    pub events: String,
}

fn invalid_field(field: &str, value: &str) -> Error {
    Error::InvalidConfig(format!("{field} has invalid value '{value}'"))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "td")
}

/// `<platform config dir>/config.toml`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Platform data directory for the task store
pub fn default_data_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(
                "could not determine a data directory; pass --data-dir or set TD_DATA_DIR"
                    .to_string(),
            )
        })
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load a config file, falling back to defaults when missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), "ignoring config: {err}");
                Self::default()
            }
        }
    }

    /// Resolve the effective config.
    ///
    /// An explicit path must exist and be valid; the platform default is
    /// optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::InvalidConfig(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::load(path)
            }
            None => Ok(default_config_path()
                .map(|path| Self::load_or_default(&path))
                .unwrap_or_default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.defaults.category()?;
        self.defaults.priority()?;
        self.view.status()?;
        self.view.sort()?;
        self.ai.validate()?;
        Ok(())
    }
}
