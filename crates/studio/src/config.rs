//! Studio configuration, stored as JSON in the platform config directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::report::document::PageFormat;
use crate::report::DEFAULT_MARGIN_MM;

const CONFIG_FILE: &str = "settings.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "graphite", "graphite")
}

/// Report export settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Wait after each view change before capturing a frame
    pub settle_delay_ms: u64,
    pub margin_mm: f64,
    pub page: PageFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            margin_mm: DEFAULT_MARGIN_MM,
            page: PageFormat::A4_LANDSCAPE,
        }
    }
}

/// All studio settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Where the model collection lives; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub export: ExportSettings,
}

impl StudioConfig {
    /// Load from the platform config directory, or defaults if missing or
    /// unreadable.
    pub fn load() -> Self {
        project_dirs()
            .map(|dirs| Self::load_from(&dirs.config_dir().join(CONFIG_FILE)))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save to the platform config directory
    pub fn save(&self) -> std::io::Result<()> {
        match project_dirs() {
            Some(dirs) => self.save_to(&dirs.config_dir().join(CONFIG_FILE)),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Storage directory: the configured one, else the platform data dir,
    /// else `./data`.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.export.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(1000));
        assert_eq!(config.export.margin_mm, 10.0);
        assert_eq!(config.export.page.width_mm, 297.0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"export":{"settle_delay_ms":250}}"#).unwrap();

        let config = StudioConfig::load_from(&path);
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.export.margin_mm, 10.0);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let config = StudioConfig {
            data_dir: Some(dir.path().join("models")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(StudioConfig::load_from(&path), config);
        assert_eq!(config.data_dir(), dir.path().join("models"));
    }

    #[test]
    fn test_garbage_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(StudioConfig::load_from(&path), StudioConfig::default());
    }
}
