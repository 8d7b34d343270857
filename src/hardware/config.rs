//! Driver configuration (`MHWDCONFIG`) parsing and discovery.
//!
//! A config file is a list of `key = value` lines:
//!
//! ```text
//! # comment
//! NAME="video-nvidia"
//! INFO="Closed source NVIDIA drivers"
//! VERSION="2023.03.23"
//! FREEDRIVER="false"
//! PRIORITY="8"
//!
//! CLASSIDS="0300 0302"
//! VENDORIDS="10de"
//! DEVICEIDS=">/var/lib/mhwd/ids/pci/nvidia.ids"
//! ```
//!
//! Keys are case insensitive. A value starting with `>` names a file whose
//! non-comment content is used as the value; relative paths are resolved
//! against the config's directory. Each repeated `CLASSIDS`, `VENDORIDS` or
//! `DEVICEIDS` key opens a new id group; empty lists in a group match any id.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::HardwareError;
use crate::models::HwKind;

/// File name every driver configuration uses.
pub const CONFIG_FILE_NAME: &str = "MHWDCONFIG";

/// Matches any id.
pub const ANY_ID: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HwIds {
    pub class_ids: Vec<String>,
    pub vendor_ids: Vec<String>,
    pub device_ids: Vec<String>,
}

/// One set of hardware ids a config applies to, with its exclusions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HwIdGroup {
    pub ids: HwIds,
    pub blacklist: HwIds,
}

/// A parsed driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HwConfig {
    pub kind: HwKind,
    pub name: String,
    pub info: String,
    pub version: String,
    pub free_driver: bool,
    pub priority: i32,
    pub groups: Vec<HwIdGroup>,
    pub dependencies: Vec<String>,
    pub conflicts: Vec<String>,
    pub base_path: PathBuf,
    pub config_path: PathBuf,
}

impl HwConfig {
    fn empty(kind: HwKind, config_path: &Path) -> Self {
        HwConfig {
            kind,
            name: String::new(),
            info: String::new(),
            version: String::new(),
            free_driver: true,
            priority: 0,
            groups: vec![HwIdGroup::default()],
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            base_path: config_path.parent().map(Path::to_path_buf).unwrap_or_default(),
            config_path: config_path.to_path_buf(),
        }
    }

    fn current_group(&mut self) -> &mut HwIdGroup {
        if self.groups.is_empty() {
            self.groups.push(HwIdGroup::default());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    /// Set an id list, opening a new group when the current one already has
    /// this list.
    fn set_ids(&mut self, value: &str, select: fn(&mut HwIds) -> &mut Vec<String>) {
        if !select(&mut self.current_group().ids).is_empty() {
            self.groups.push(HwIdGroup::default());
        }
        *select(&mut self.current_group().ids) = split_value(value);
    }

    fn fill_default_ids(&mut self) {
        for group in &mut self.groups {
            for list in [
                &mut group.ids.class_ids,
                &mut group.ids.vendor_ids,
                &mut group.ids.device_ids,
            ] {
                if list.is_empty() {
                    list.push(ANY_ID.to_string());
                }
            }
        }
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> HardwareError {
    HardwareError::InvalidConfig {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Lowercase, whitespace separated list.
fn split_value(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_lowercase).collect()
}

fn resolve_path(value: &str, base: &Path) -> PathBuf {
    let value = Path::new(value.trim());
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

/// Content of a `>file` value: non-comment lines joined by single spaces.
fn read_external_value(path: &Path) -> std::io::Result<String> {
    let content = fs::read_to_string(path)?;
    let words: Vec<&str> = content
        .lines()
        .map(strip_comment)
        .flat_map(str::split_whitespace)
        .collect();
    Ok(words.join(" "))
}

fn read_config_into(
    config: &mut HwConfig,
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<(), HardwareError> {
    if !visited.insert(path.to_path_buf()) {
        return Err(invalid(path, "include cycle"));
    }

    let content = fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;

    for raw in content.lines() {
        let line = strip_comment(raw).trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim().to_lowercase();
        let mut value = value.trim().trim_matches('"').trim().to_string();

        if value.len() > 1 && value.starts_with('>') {
            let external = resolve_path(&value[1..], &config.base_path);
            value = read_external_value(&external).map_err(|e| {
                invalid(path, format!("cannot read {}: {}", external.display(), e))
            })?;
        }

        match key.as_str() {
            "include" => {
                let include = resolve_path(&value, &config.base_path);
                // A broken include does not invalidate the including config
                if let Err(e) = read_config_into(config, &include, visited) {
                    log::warn!("[Hardware] Ignoring include in {}: {}", path.display(), e);
                }
            }
            "name" => config.name = value.to_lowercase(),
            "version" => config.version = value,
            "info" => config.info = value,
            "priority" => {
                if let Ok(priority) = value.parse::<i32>() {
                    config.priority = priority;
                }
            }
            "freedriver" => match value.to_lowercase().as_str() {
                "true" => config.free_driver = true,
                "false" => config.free_driver = false,
                _ => {}
            },
            "classids" => config.set_ids(&value, |ids| &mut ids.class_ids),
            "vendorids" => config.set_ids(&value, |ids| &mut ids.vendor_ids),
            "deviceids" => config.set_ids(&value, |ids| &mut ids.device_ids),
            "blacklistedclassids" => config.current_group().blacklist.class_ids = split_value(&value),
            "blacklistedvendorids" => config.current_group().blacklist.vendor_ids = split_value(&value),
            "blacklisteddeviceids" => config.current_group().blacklist.device_ids = split_value(&value),
            "mhwddepends" => config.dependencies = split_value(&value),
            "mhwdconflicts" => config.conflicts = split_value(&value),
            _ => {}
        }
    }

    Ok(())
}

/// Parse one `MHWDCONFIG` file.
pub fn parse_config_file(path: &Path, kind: HwKind) -> Result<HwConfig, HardwareError> {
    let mut config = HwConfig::empty(kind, path);
    let mut visited = HashSet::new();
    read_config_into(&mut config, path, &mut visited)?;
    config.fill_default_ids();

    if config.name.is_empty() {
        return Err(invalid(path, "missing NAME"));
    }
    Ok(config)
}

/// All `MHWDCONFIG` files below `dir`, in path order. A missing directory
/// yields nothing.
pub fn find_config_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_config_files(dir, &mut found);
    found.sort();
    found
}

fn collect_config_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            collect_config_files(&path, found);
        } else if file_type.is_file() && entry.file_name() == CONFIG_FILE_NAME {
            found.push(path);
        }
    }
}

/// Parse every config below `dir`. Returns the valid configs and the errors
/// of the invalid ones.
pub fn load_configs(dir: &Path, kind: HwKind) -> (Vec<HwConfig>, Vec<HardwareError>) {
    let mut configs = Vec::new();
    let mut invalid = Vec::new();

    for path in find_config_files(dir) {
        match parse_config_file(&path, kind) {
            Ok(config) => configs.push(config),
            Err(e) => {
                log::warn!("[Hardware] {}", e);
                invalid.push(e);
            }
        }
    }

    log::debug!(
        "[Hardware] Loaded {} {} configs from {} ({} invalid)",
        configs.len(),
        kind,
        dir.display(),
        invalid.len()
    );
    (configs, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_basic_config() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "video-nvidia/MHWDCONFIG",
            r#"
# NVIDIA proprietary driver
NAME="Video-Nvidia"
INFO="Closed source NVIDIA drivers"
VERSION="2023.03.23"
FREEDRIVER="false"
PRIORITY="8"   # preferred

CLASSIDS="0300 0302"
VENDORIDS="10DE"
BLACKLISTEDDEVICEIDS="1c82"
MHWDDEPENDS="video-linux"
MHWDCONFLICTS="video-nouveau video-vesa"
"#,
        );

        let config = parse_config_file(&path, HwKind::Pci).unwrap();
        assert_eq!(config.name, "video-nvidia");
        assert_eq!(config.info, "Closed source NVIDIA drivers");
        assert_eq!(config.version, "2023.03.23");
        assert!(!config.free_driver);
        assert_eq!(config.priority, 8);
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].ids.class_ids, vec!["0300", "0302"]);
        assert_eq!(config.groups[0].ids.vendor_ids, vec!["10de"]);
        assert_eq!(config.groups[0].ids.device_ids, vec!["*"]);
        assert_eq!(config.groups[0].blacklist.device_ids, vec!["1c82"]);
        assert_eq!(config.dependencies, vec!["video-linux"]);
        assert_eq!(config.conflicts, vec!["video-nouveau", "video-vesa"]);
        assert_eq!(config.base_path, dir.path().join("video-nvidia"));
    }

    #[test]
    fn test_repeated_ids_open_new_group() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "hybrid/MHWDCONFIG",
            "NAME=hybrid\nCLASSIDS=0300\nVENDORIDS=8086\nCLASSIDS=0302\nVENDORIDS=10de\n",
        );

        let config = parse_config_file(&path, HwKind::Pci).unwrap();
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.groups[0].ids.vendor_ids, vec!["8086"]);
        assert_eq!(config.groups[1].ids.class_ids, vec!["0302"]);
        assert_eq!(config.groups[1].ids.vendor_ids, vec!["10de"]);
    }

    #[test]
    fn test_external_value_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "nvidia/ids/devices.ids",
            "# supported\n1c82 1c8c\n\n  1f08   # turing\n",
        );
        let path = write(
            dir.path(),
            "nvidia/MHWDCONFIG",
            "NAME=nvidia\nDEVICEIDS=\">ids/devices.ids\"\n",
        );

        let config = parse_config_file(&path, HwKind::Pci).unwrap();
        assert_eq!(config.groups[0].ids.device_ids, vec!["1c82", "1c8c", "1f08"]);
    }

    #[test]
    fn test_missing_external_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "x/MHWDCONFIG", "NAME=x\nDEVICEIDS=>missing.ids\n");
        assert!(matches!(
            parse_config_file(&path, HwKind::Pci),
            Err(HardwareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_include_shares_settings() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "common/base.conf", "INFO=shared info\nPRIORITY=3\n");
        let path = write(
            dir.path(),
            "driver/MHWDCONFIG",
            "INCLUDE=../common/base.conf\nNAME=driver\nINCLUDE=missing.conf\n",
        );

        let config = parse_config_file(&path, HwKind::Usb).unwrap();
        assert_eq!(config.info, "shared info");
        assert_eq!(config.priority, 3);
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "loop/MHWDCONFIG", "NAME=loop\nINCLUDE=MHWDCONFIG\n");
        assert_eq!(parse_config_file(&path, HwKind::Pci).unwrap().name, "loop");
    }

    #[test]
    fn test_config_without_name_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "noname/MHWDCONFIG", "CLASSIDS=0300\n");
        assert!(matches!(
            parse_config_file(&path, HwKind::Pci),
            Err(HardwareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_discovery_and_load() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/MHWDCONFIG", "NAME=a\n");
        write(dir.path(), "b/nested/MHWDCONFIG", "NAME=b\n");
        write(dir.path(), "c/MHWDCONFIG", "INFO=no name\n");
        write(dir.path(), "d/README", "NAME=ignored\n");

        let files = find_config_files(dir.path());
        assert_eq!(files.len(), 3);

        let (configs, invalid) = load_configs(dir.path(), HwKind::Pci);
        let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        assert!(find_config_files(Path::new("/nonexistent/mhwd")).is_empty());
    }
}
