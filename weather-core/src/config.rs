use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";
pub const DEFAULT_LOCATION: &str = "London";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Provider access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WeatherAPI.com key; absent until `weather configure` has been run.
    #[serde(default)]
    pub key: Option<String>,
}

/// Dashboard behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_location")]
    pub default_location: String,

    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Overrides the history CSV location.
    #[serde(default)]
    pub history_path: Option<PathBuf>,

    /// Also append logs to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [api]
/// key = "..."
/// [app]
/// default_location = "London"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub app: AppConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

const fn default_update_interval_secs() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), key: None }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
            update_interval_secs: default_update_interval_secs(),
            history_path: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load config from the platform location, or defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where refresh history is appended.
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.app.history_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("weather_history.csv")),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.app.update_interval_secs.max(1))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api.key = Some(api_key);
    }

    /// Returns the API key, if a non-empty one is present.
    pub fn api_key(&self) -> Option<&str> {
        self.api.key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-task", "weather-cli")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
