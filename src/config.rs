//! Configuration for taskmate

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show completed tasks in `list` unless a status filter says otherwise
    #[serde(default = "default_show_completed")]
    pub show_completed: bool,

    /// chrono format string for due dates
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Color priorities with ANSI escapes
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taskmate").join("taskmate.sqlite"))
        .unwrap_or_else(|| PathBuf::from("taskmate.sqlite"))
}

fn default_show_completed() -> bool {
    true
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_completed: default_show_completed(),
            date_format: default_date_format(),
            color: default_color(),
        }
    }
}

/// Environment variable naming the config file explicitly.
pub const CONFIG_ENV: &str = "TASKMATE_CONFIG";

/// Per-directory config, written by `taskmate init`.
pub const LOCAL_CONFIG: &str = "taskmate.toml";

const HEADER: &str = "\
# taskmate configuration
#
# [storage] path            SQLite file holding the task list
# [display] show_completed  list completed tasks by default
#           date_format     chrono format for due dates
#           color           color priority markers
#
# Set TASKMATE_CONFIG to this file to use it outside this directory.

";

impl Config {
    /// Config file location: `$TASKMATE_CONFIG`, else `./taskmate.toml` if
    /// present, else `taskmate/config.toml` under the user config directory.
    pub fn default_path() -> Result<PathBuf> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let local = Path::new(LOCAL_CONFIG);
        let local = local.exists().then(|| local.to_path_buf());
        resolve_path(explicit, local, dirs::config_dir())
    }

    /// Config from [`Config::default_path`]; defaults until a file exists.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Write the config with a header describing each setting.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, format!("{HEADER}{body}"))
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}

fn resolve_path(
    explicit: Option<PathBuf>,
    local: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit.or(local) {
        return Ok(path);
    }
    let dir = config_dir.with_context(|| {
        format!("Could not determine config directory; set {CONFIG_ENV}")
    })?;
    Ok(dir.join("taskmate").join("config.toml"))
}
