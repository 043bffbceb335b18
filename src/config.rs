//! Dashboard Configuration Module
//! Loads data paths and export settings from an optional JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable pointing to an alternative config file
pub const CONFIG_ENV_VAR: &str = "BIRING_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "biring.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Paths and labels used by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub daily_csv: PathBuf,
    pub hourly_csv: PathBuf,
    pub export_dir: PathBuf,
    pub title: String,
    /// Sidebar logo; the text title is shown when absent or unreadable
    pub logo: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            daily_csv: PathBuf::from("dashboard/data_clean_day.csv"),
            hourly_csv: PathBuf::from("dashboard/data_clean_hour.csv"),
            export_dir: PathBuf::from("exports"),
            title: "BIRING : Bike Sharing Dashboard".to_string(),
            logo: Some(PathBuf::from("icon/logo.png")),
        }
    }
}

impl DashboardConfig {
    /// Load config from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config path from `BIRING_CONFIG` or `biring.json` and load it.
    pub fn discover() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = tempdir().unwrap();
        let cfg = DashboardConfig::load(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("biring.json");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{ "daily_csv": "data/day.csv", "title": "Bikes" }}"#).unwrap();

        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.daily_csv, PathBuf::from("data/day.csv"));
        assert_eq!(cfg.title, "Bikes");
        assert_eq!(cfg.hourly_csv, DashboardConfig::default().hourly_csv);
        assert_eq!(cfg.logo, Some(PathBuf::from("icon/logo.png")));
    }

    #[test]
    fn logo_can_be_disabled() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("biring.json");
        std::fs::write(&path, r#"{ "logo": null }"#).unwrap();

        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.logo, None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = DashboardConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
