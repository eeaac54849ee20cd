use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{http::DEFAULT_TIMEOUT_SECS, provider::wttr::WTTR_BASE_URL};

/// Where forecasts come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self { base_url: WTTR_BASE_URL.to_string() }
    }
}

/// Where per-user overrides are stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSettings {
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// user_email = "me@example.com"
///
/// [overrides]
/// base_url = "http://localhost:3000"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Identifies whose overrides are read and written.
    pub user_email: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub overrides: OverrideSettings,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_email: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            provider: ProviderSettings::default(),
            overrides: OverrideSettings::default(),
        }
    }
}

impl Config {
    /// The configured user email, with a hint on how to set it.
    pub fn user_email(&self) -> Result<&str> {
        self.user_email.as_deref().filter(|e| !e.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No user email configured.\n\
                 Hint: run `daycast configure` and enter the email your overrides belong to."
            )
        })
    }

    /// Base URL of the override service, with a hint on how to set it.
    pub fn override_base_url(&self) -> Result<&str> {
        self.overrides.base_url.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No override service configured.\n\
                 Hint: run `daycast configure` and enter the override service URL."
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn set_user_email(&mut self, email: String) {
        self.user_email = Some(email.trim().to_string());
    }

    pub fn set_override_base_url(&mut self, url: String) {
        self.overrides.base_url = Some(url.trim().trim_end_matches('/').to_string());
    }

    pub fn is_configured(&self) -> bool {
        self.user_email().is_ok() && self.override_base_url().is_ok()
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

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

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "daycast", "daycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the last-selected location.
    pub fn location_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("location.json"))
    }

    /// Path to the persisted weather cache.
    pub fn cache_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.cache_dir().join("weather_cache.json"))
    }
}
