//! # Atlas Config
//!
//! Configuration for the resale atlas.
//!
//! Resolution order, later layers winning:
//! 1. built-in defaults
//! 2. YAML file (explicit path, or `~/.config/resale-atlas/config.yaml`)
//! 3. environment: `ATLAS_API_ENDPOINT`, `ATLAS_DEBOUNCE_MS`

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for [`ApiConfig::endpoint`]
pub const ENV_API_ENDPOINT: &str = "ATLAS_API_ENDPOINT";
/// Environment override for [`FetchConfig::debounce_ms`]
pub const ENV_DEBOUNCE_MS: &str = "ATLAS_DEBOUNCE_MS";

/// Longest debounce accepted before a selection change feels unresponsive
pub const MAX_DEBOUNCE_MS: u64 = 1_000;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Dynamic price fetch tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Quiet period before a selection change hits the network
    pub debounce_ms: u64,
    /// Rolling window of price history requested per selection
    pub price_window_years: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            price_window_years: 3,
        }
    }
}

impl FetchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Initial selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub flat_type: String,
    /// Earliest completion year offered by the year range
    pub first_year: i32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            flat_type: "4 ROOM".to_string(),
            first_year: 1960,
        }
    }
}

/// Camera defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[lon, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
    /// Zoom used when flying to a highlighted town
    pub highlight_zoom: f64,
    pub single_town_zoom: f64,
    pub multi_town_zoom: f64,
    pub padding: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [103.9, 1.35],
            zoom: 12.2,
            highlight_zoom: 15.0,
            single_town_zoom: 14.0,
            multi_town_zoom: 12.5,
            padding: 20,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub selection: SelectionConfig,
    pub map: MapConfig,
}

impl AtlasConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("resale-atlas").join("config.yaml"))
    }

    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Resolve the full layered configuration and validate it.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading config");
                Self::from_file(path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!(path = %path.display(), "loading config");
                    Self::from_file(&path)?
                }
                None => {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_API_ENDPOINT) {
            tracing::debug!(%endpoint, "endpoint overridden from environment");
            self.api.endpoint = endpoint;
        }

        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            self.fetch.debounce_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a number: {:?}", ENV_DEBOUNCE_MS, raw))
            })?;
        }

        Ok(())
    }

    /// Reject settings the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("api.endpoint is empty".into()));
        }

        if self.fetch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Invalid(format!(
                "fetch.debounce_ms {} exceeds {}",
                self.fetch.debounce_ms, MAX_DEBOUNCE_MS
            )));
        }

        if self.fetch.price_window_years == 0 {
            return Err(ConfigError::Invalid(
                "fetch.price_window_years must be at least 1".into(),
            ));
        }

        let current_year = chrono::Local::now().year();
        if self.selection.first_year > current_year {
            return Err(ConfigError::Invalid(format!(
                "selection.first_year {} is after {}",
                self.selection.first_year, current_year
            )));
        }

        Ok(())
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AtlasConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.endpoint, "http://127.0.0.1:8000");
        assert_eq!(config.fetch.debounce(), Duration::from_millis(200));
        assert_eq!(config.map.center, [103.9, 1.35]);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AtlasConfig::from_yaml("fetch:\n  debounce_ms: 150\n").unwrap();
        assert_eq!(config.fetch.debounce_ms, 150);
        assert_eq!(config.fetch.price_window_years, 3);
        assert_eq!(config.selection.flat_type, "4 ROOM");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api:\n  endpoint: http://prices.internal:9000\nmap:\n  padding: 40").unwrap();

        let config = AtlasConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.endpoint, "http://prices.internal:9000");
        assert_eq!(config.map.padding, 40);
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AtlasConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [(ENV_API_ENDPOINT, "http://override:1"), (ENV_DEBOUNCE_MS, " 250 ")].into();
        let mut config = AtlasConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.endpoint, "http://override:1");
        assert_eq!(config.fetch.debounce_ms, 250);
    }

    #[test]
    fn test_bad_env_debounce_rejected() {
        let mut config = AtlasConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_DEBOUNCE_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AtlasConfig::default();
        config.fetch.debounce_ms = 5_000;
        assert!(config.validate().is_err());

        let mut config = AtlasConfig::default();
        config.fetch.price_window_years = 0;
        assert!(config.validate().is_err());

        let mut config = AtlasConfig::default();
        config.api.endpoint = "  ".into();
        assert!(config.validate().is_err());

        let mut config = AtlasConfig::default();
        config.selection.first_year = 9999;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AtlasConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(AtlasConfig::from_yaml(&yaml).unwrap(), config);
    }
}
