use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::HexColor;
use crate::project::settings::{MainColorDefault, DEFAULT_MAIN_COLOR};

/// How a project without a stored main color gets one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MainColorMode {
    /// Always the configured seed color
    Seed,
    /// A random color, saved to the project on first use
    Random,
}

fn default_main_color_mode() -> MainColorMode {
    MainColorMode::Random
}

fn default_seed_color() -> String {
    DEFAULT_MAIN_COLOR.to_string()
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_editor_command() -> String {
    "code".to_string()
}

/// Application settings (~/.project-colors/config.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_main_color_mode")]
    pub main_color_default: MainColorMode,
    #[serde(default = "default_seed_color")]
    pub seed_color: String,
    /// Quiet period before a burst of settings changes is re-applied
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How often `watch` checks the settings file
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Editor launched by `open`; extra arguments are allowed
    #[serde(default = "default_editor_command")]
    pub editor_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_color_default: default_main_color_mode(),
            seed_color: default_seed_color(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            editor_command: default_editor_command(),
        }
    }
}

impl Config {
    /// Returns the config directory path (~/.project-colors)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".project-colors"))
    }

    /// Returns the config file path (~/.project-colors/config.json)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.json"))
    }

    /// Global store holding the workspace list and groups
    pub fn global_store_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("global.json"))
    }

    /// Loads the config file, returns default if not found or invalid
    pub fn load() -> Self {
        match Self::load_with_error() {
            Ok(config) => config,
            Err(message) => {
                tracing::debug!("{}", message);
                Self::default()
            }
        }
    }

    /// Loads the config file with error information
    pub fn load_with_error() -> Result<Self, String> {
        let config_path = Self::config_path()
            .ok_or_else(|| "Could not determine config path".to_string())?;

        let content = fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in config.json: {}", e))
    }

    /// Saves the config file using atomic write pattern
    pub fn save(&self) -> io::Result<()> {
        let Some(config_dir) = Self::config_dir() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            ));
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
            // Set directory permissions to user-only on Unix
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                let _ = fs::set_permissions(&config_dir, perms);
            }
        }

        let config_path = config_dir.join("config.json");
        let temp_path = config_dir.join("config.json.tmp");
        let content = serde_json::to_string_pretty(self)?;

        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Resolver fallback for projects without a stored main color.
    /// An invalid seed falls back to the built-in one.
    pub fn main_color_default(&self) -> MainColorDefault {
        match self.main_color_default {
            MainColorMode::Random => MainColorDefault::Random,
            MainColorMode::Seed => match HexColor::parse(&self.seed_color) {
                Ok(seed) => MainColorDefault::Seed(seed),
                Err(_) => {
                    tracing::warn!(seed = %self.seed_color, "invalid seed color in config, using the built-in one");
                    MainColorDefault::default()
                }
            },
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}
