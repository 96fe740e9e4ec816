use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    map::{DEFAULT_ATTRIBUTION, DEFAULT_CENTER, DEFAULT_TILE_URL, DEFAULT_ZOOM},
    model::Theme,
};

/// Environment variable that overrides the API key stored on disk.
pub const CREDENTIAL_ENV_VAR: &str = "OPENWEATHER_API_KEY";

/// OpenWeather API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars hidden>)", self.0.len())
    }
}

/// `[openweather]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenWeatherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the API host, e.g. a local mock server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// `[map]` section: initial viewport and tile provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_CENTER.latitude,
            longitude: DEFAULT_CENTER.longitude,
            zoom: DEFAULT_ZOOM,
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// theme = "dark"
///
/// [openweather]
/// api_key = "..."
///
/// [map]
/// latitude = 51.505
/// longitude = -0.09
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,

    #[serde(default)]
    pub openweather: OpenWeatherConfig,

    #[serde(default)]
    pub map: MapConfig,
}

impl Config {
    /// The configured credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.openweather.api_key.clone().and_then(Credential::new)
    }

    /// Set/replace the stored API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(CREDENTIAL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.openweather.api_key = Some(key);
        }
    }

    /// Load config from the platform path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with_env(&Self::config_file_path()?)
    }

    /// Load config from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut cfg = Self::load_from(path)?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform path.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
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
        let dirs = ProjectDirs::from("dev", "skylook", "skylook")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_credential() {
        let cfg = Config::default();
        assert!(cfg.credential().is_none());
        assert_eq!(cfg.map.zoom, DEFAULT_ZOOM);
        assert_eq!(cfg.theme, Theme::Light);
    }

    #[test]
    fn blank_api_key_is_not_a_credential() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());
        assert!(cfg.credential().is_none());
    }

    #[test]
    fn env_overrides_file_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env(|name| (name == CREDENTIAL_ENV_VAR).then(|| "ENV_KEY".to_string()));

        let cred = cfg.credential().expect("credential must be set");
        assert_eq!(cred.expose(), "ENV_KEY");
    }

    #[test]
    fn empty_env_value_keeps_file_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE_KEY".into());

        cfg.apply_env(|_| Some(String::new()));

        assert_eq!(cfg.credential().map(|c| c.len()), Some(8));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::new("supersecret").expect("non-empty");
        let shown = format!("{cred:?}");
        assert!(!shown.contains("supersecret"));
        assert!(shown.contains("11 chars"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("nope.toml")).expect("defaults");
        assert!(cfg.credential().is_none());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());
        cfg.theme = Theme::Dark;
        cfg.map.zoom = 9;
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.credential().map(|c| c.expose().to_string()), Some("OPEN_KEY".into()));
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.map.zoom, 9);
        assert_eq!(loaded.map.tile_url, DEFAULT_TILE_URL);
    }

    #[test]
    fn load_with_env_reads_the_given_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "theme = \"dark\"\n[map]\nzoom = 4\n").expect("write");

        let cfg = Config::load_with_env(&path).expect("load");
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.map.zoom, 4);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[map]\nzoom = 5\n").expect("parse");
        assert_eq!(cfg.map.zoom, 5);
        assert_eq!(cfg.map.latitude, DEFAULT_CENTER.latitude);
        assert!(cfg.openweather.base_url.is_none());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "theme = [").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
