use anyhow::{Context, Result};
use dirs::home_dir;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".absurdpg";
const ENV_PREFIX: &str = "ABSURDPG";

/// Runtime settings, layered from built-in defaults, an optional
/// `~/.absurdpg/settings.toml` and `ABSURDPG_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub profiles_path: PathBuf,
    /// Log destination. An empty value turns logging off.
    pub log_file: PathBuf,
    pub log_level: String,
    /// Name of a stored profile used to pre-fill the connection form.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub theme: ThemeSettings,
}

/// Colour names or `#RRGGBB` values for each themed element.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeSettings {
    pub title: String,
    pub text: String,
    pub accent: String,
    pub error: String,
    pub border: String,
    pub tab: String,
    pub active_tab: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        ThemeSettings {
            title: "#89B4FA".to_string(),
            text: "#CDD6F4".to_string(),
            accent: "#F38BA8".to_string(),
            error: "#F38BA8".to_string(),
            border: "#B4BEFE".to_string(),
            tab: "#B4BEFE".to_string(),
            active_tab: "#F38BA8".to_string(),
        }
    }
}

impl Settings {
    /// The log file, or `None` when logging is turned off.
    pub fn log_path(&self) -> Option<&Path> {
        if self.log_file.as_os_str().is_empty() {
            None
        } else {
            Some(&self.log_file)
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&app_dir().join("settings.toml"))
    }

    /// Loads settings using `path` as the optional settings file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let dir = app_dir();
        config::Config::builder()
            .set_default("profiles_path", path_string(&dir.join("configs.json")))?
            .set_default("log_file", path_string(&dir.join("absurdpg.log")))?
            .set_default("log_level", "info")?
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("could not read settings from {}", path.display()))?
            .try_deserialize()
            .context("invalid settings")
    }
}

fn app_dir() -> PathBuf {
    // Fall back to the current directory when no home directory is known
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
