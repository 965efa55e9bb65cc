use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use std::fs;

use super::alerts::model::Position;
use super::alerts::scheduler::DEFAULT_TICK_INTERVAL;
use super::error::Result;

/// Alert behaviour seeded into the store at startup.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AlertSettings {
    pub sound_enabled: bool,
    pub position: Position,
    /// Used when an alert does not specify its own duration
    pub default_duration_ms: u64,
    /// Progress recomputation cadence
    pub tick_interval_ms: u64,
}

impl AlertSettings {
    pub fn tick_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            position: Position::TopRight,
            default_duration_ms: 5000,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
        }
    }
}

/// Application settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub alert_settings: AlertSettings,
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    /// Settings from disk, or defaults when the file is missing or unreadable.
    pub fn load(&self) -> Settings {
        if !self.config_path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(&self.config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed {:?}: {}", self.config_path, e);
                    Settings::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {:?}: {}", self.config_path, e);
                Settings::default()
            }
        }
    }

    /// Like [`Self::load`], but writes the defaults out on first run so there
    /// is a file to edit. A failed write is logged and otherwise ignored.
    pub fn load_or_init(&self) -> Settings {
        if self.config_path.exists() {
            return self.load();
        }
        let settings = Settings::default();
        match self.save(&settings) {
            Ok(()) => log::info!("Wrote default settings to {:?}", self.config_path),
            Err(e) => log::warn!("Could not write {:?}: {}", self.config_path, e),
        }
        settings
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("nested"));

        let default = manager.load();
        assert_eq!(default.alert_settings.default_duration_ms, 5000);
        assert_eq!(default.alert_settings.tick_interval_ms, 100);

        let new_settings = Settings {
            alert_settings: AlertSettings {
                sound_enabled: false,
                position: Position::BottomLeft,
                default_duration_ms: 3000,
                tick_interval_ms: 50,
            },
        };

        manager.save(&new_settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded, new_settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("settings.json"),
            r#"{ "alert_settings": { "position": "top-center" } }"#,
        )
        .unwrap();

        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert_eq!(loaded.alert_settings.position, Position::TopCenter);
        assert!(loaded.alert_settings.sound_enabled);
        assert_eq!(loaded.alert_settings.default_duration_ms, 5000);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

        let loaded = ConfigManager::new(dir.path().to_path_buf()).load();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_first_run_writes_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("fresh"));

        assert_eq!(manager.load_or_init(), Settings::default());
        let written = fs::read_to_string(dir.path().join("fresh").join("settings.json")).unwrap();
        let parsed: Settings = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, Settings::default());

        // An existing file is read, never overwritten.
        let custom = Settings {
            alert_settings: AlertSettings {
                sound_enabled: false,
                ..AlertSettings::default()
            },
        };
        manager.save(&custom).unwrap();
        assert_eq!(manager.load_or_init(), custom);
        assert_eq!(manager.load(), custom);
    }

    #[test]
    fn test_zero_tick_interval_is_clamped() {
        let settings = AlertSettings {
            tick_interval_ms: 0,
            ..AlertSettings::default()
        };
        assert_eq!(settings.tick_interval(), Duration::from_millis(1));
    }
}
