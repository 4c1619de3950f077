//! Persistent settings for the phone-pilot CLI.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::model::DEFAULT_BASE_URL;
use crate::ui::wda::DEFAULT_WDA_URL;

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model name
    pub model_name: String,
    /// WebDriverAgent server URL
    pub wda_url: String,
    /// Response cache directory; the platform cache directory when empty
    pub cache_dir: String,
    /// Reuse earlier model responses for identical requests
    pub use_cache: bool,
    /// Print the run to stdout
    pub verbose: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_name: "gpt-4".to_string(),
            wda_url: DEFAULT_WDA_URL.to_string(),
            cache_dir: String::new(),
            use_cache: true,
            verbose: true,
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "moderras", "phone-pilot")
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .map(|content| Self::from_json(&content))
            .unwrap_or_default()
    }

    /// Parse settings, backfilling fields that are missing or blank.
    pub fn from_json(content: &str) -> Self {
        let defaults = Self::default();
        let mut loaded: Self = serde_json::from_str(content).unwrap_or_default();

        if loaded.base_url.is_empty() {
            loaded.base_url = defaults.base_url;
        }
        if loaded.model_name.is_empty() {
            loaded.model_name = defaults.model_name;
        }
        if loaded.wda_url.is_empty() {
            loaded.wda_url = defaults.wda_url;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// Directory for cached model responses.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        if !self.cache_dir.is_empty() {
            return Some(PathBuf::from(&self.cache_dir));
        }
        project_dirs().map(|dirs| dirs.cache_dir().join("responses"))
    }
}
