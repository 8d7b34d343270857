//! Backend settings file (TOML).
//!
//! Covers logging, privilege escalation and hardware database locations.
//! The package catalog always reads the fixed pacman configuration and is
//! deliberately not configurable here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const SETTINGS_DIR: &str = "control-panel";
const SETTINGS_FILE: &str = "settings.toml";

/// Locations of the hardware driver configuration databases, sysfs and the
/// `pci.ids`/`usb.ids` name databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwarePaths {
    pub usb_config_dir: PathBuf,
    pub pci_config_dir: PathBuf,
    pub usb_installed_dir: PathBuf,
    pub pci_installed_dir: PathBuf,
    pub sysfs_root: PathBuf,
    pub ids_dir: PathBuf,
}

impl Default for HardwarePaths {
    fn default() -> Self {
        HardwarePaths {
            usb_config_dir: PathBuf::from("/var/lib/mhwd/db/usb"),
            pci_config_dir: PathBuf::from("/var/lib/mhwd/db/pci"),
            usb_installed_dir: PathBuf::from("/var/lib/mhwd/local/usb"),
            pci_installed_dir: PathBuf::from("/var/lib/mhwd/local/pci"),
            sysfs_root: PathBuf::from("/sys"),
            ids_dir: PathBuf::from("/usr/share/hwdata"),
        }
    }
}

/// Persistent backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Directory for session log files; `None` logs to stderr only
    pub log_dir: Option<PathBuf>,
    /// One of error, warn, info, debug, trace
    pub log_level: String,
    /// Program used to gain root for transactions; empty runs pacman directly
    pub privilege_helper: String,
    pub hardware: HardwarePaths,
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            log_dir: None,
            log_level: "info".to_string(),
            privilege_helper: "pkexec".to_string(),
            hardware: HardwarePaths::default(),
        }
    }
}

impl BackendSettings {
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level.parse::<log::LevelFilter>().map_err(|_| {
            ConfigError::ValidationFailed(format!("Unknown log level '{}'", self.log_level))
        })
    }

    /// Privilege helper, or `None` when transactions run without one.
    pub fn privilege_helper(&self) -> Option<&str> {
        let helper = self.privilege_helper.trim();
        if helper.is_empty() {
            None
        } else {
            Some(helper)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter()?;
        if self.privilege_helper.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationFailed(format!(
                "Privilege helper must be a single program name, got '{}'",
                self.privilege_helper
            )));
        }
        Ok(())
    }
}

/// Default settings path: ~/.config/control-panel/settings.toml
pub fn get_settings_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine config directory".to_string())
    })?;

    Ok(config_dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Load settings; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<BackendSettings, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("[Config] No settings at {}, using defaults", path.display());
            return Ok(BackendSettings::default());
        }
        Err(e) => return Err(ConfigError::IoError(e)),
    };

    let settings: BackendSettings = toml::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

/// Save settings, creating parent directories as needed.
pub fn save_settings(settings: &BackendSettings, path: &Path) -> Result<(), ConfigError> {
    settings.validate()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings(Path::new("/nonexistent/settings.toml")).unwrap();
        assert_eq!(settings, BackendSettings::default());
        assert_eq!(settings.privilege_helper(), Some("pkexec"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(
            &path,
            "log_level = \"debug\"\n\n[hardware]\nsysfs_root = \"/tmp/sys\"\n",
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.level_filter().unwrap(), log::LevelFilter::Debug);
        assert_eq!(settings.hardware.sysfs_root, PathBuf::from("/tmp/sys"));
        assert_eq!(
            settings.hardware.pci_config_dir,
            PathBuf::from("/var/lib/mhwd/db/pci")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/settings.toml");

        let mut settings = BackendSettings::default();
        settings.log_dir = Some(temp_dir.path().join("logs"));
        settings.privilege_helper = String::new();
        save_settings(&settings, &path).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.privilege_helper(), None);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "log_level = \"loud\"\n").unwrap();

        assert!(matches!(
            load_settings(&path),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "log_level = ").unwrap();

        assert!(matches!(load_settings(&path), Err(ConfigError::InvalidToml(_))));
    }
}
