//! pacman.conf reader.
//!
//! Only the parts the catalog needs are interpreted: the `RootDir` and
//! `DBPath` options and the names of the repository sections, in file order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Fixed location of the package manager configuration.
pub const PACMAN_CONFIG_PATH: &str = "/etc/pacman.conf";

const DEFAULT_ROOT: &str = "/";
const DEFAULT_DBPATH: &str = "/var/lib/pacman";

/// Parsed pacman configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacmanConfig {
    /// File the configuration was read from
    pub path: PathBuf,
    pub root_dir: String,
    pub db_path: String,
    /// Repository sections, in the order pacman consults them
    pub repos: Vec<String>,
}

impl Default for PacmanConfig {
    fn default() -> Self {
        PacmanConfig {
            path: PathBuf::from(PACMAN_CONFIG_PATH),
            root_dir: DEFAULT_ROOT.to_string(),
            db_path: DEFAULT_DBPATH.to_string(),
            repos: Vec::new(),
        }
    }
}

impl PacmanConfig {
    pub fn repo_names(&self) -> Vec<&str> {
        self.repos.iter().map(String::as_str).collect()
    }
}

/// Load and parse a pacman configuration file.
pub fn load_pacman_config(path: &Path) -> Result<PacmanConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let mut config = parse_pacman_config(&content)?;
    config.path = path.to_path_buf();
    Ok(config)
}

/// Parse pacman.conf text.
///
/// Directives inside repository sections (`Server`, `Include`, `SigLevel`)
/// are skipped: the catalog reads databases already synchronized on disk.
pub fn parse_pacman_config(content: &str) -> Result<PacmanConfig, ConfigError> {
    let mut config = PacmanConfig::default();
    let mut section: Option<String> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[') {
            let name = name.strip_suffix(']').ok_or_else(|| {
                ConfigError::ValidationFailed(format!(
                    "line {}: unterminated section header '{}'",
                    index + 1,
                    line
                ))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "line {}: empty section name",
                    index + 1
                )));
            }
            if name != "options" {
                config.repos.push(name.to_string());
            }
            section = Some(name.to_string());
            continue;
        }

        let (key, value) = split_key_value(line);
        match section.as_deref() {
            None => {
                return Err(ConfigError::ValidationFailed(format!(
                    "line {}: directive '{}' outside of any section",
                    index + 1,
                    key
                )));
            }
            Some("options") => match (key, value) {
                ("RootDir", Some(value)) => config.root_dir = value.to_string(),
                ("DBPath", Some(value)) => config.db_path = value.to_string(),
                _ => {}
            },
            Some(_) => {}
        }
    }

    Ok(config)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

fn split_key_value(line: &str) -> (&str, Option<&str>) {
    match line.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (line.trim(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
# General options
[options]
RootDir     = /
DBPath      = /var/lib/pacman/
CacheDir    = /var/cache/pacman/pkg/
HoldPkg     = pacman glibc
Architecture = auto
CheckSpace
SigLevel    = Required DatabaseOptional

[core]
SigLevel = PackageRequired
Include = /etc/pacman.d/mirrorlist

[extra]
Include = /etc/pacman.d/mirrorlist

#[multilib]
#Include = /etc/pacman.d/mirrorlist

[custom]
Server = file:///home/custompkgs
"#;

    #[test]
    fn test_parse_options_and_repos() {
        let config = parse_pacman_config(SAMPLE).unwrap();

        assert_eq!(config.root_dir, "/");
        assert_eq!(config.db_path, "/var/lib/pacman/");
        assert_eq!(config.repo_names(), vec!["core", "extra", "custom"]);
    }

    #[test]
    fn test_defaults_when_options_absent() {
        let config = parse_pacman_config("[core]\n").unwrap();
        assert_eq!(config.root_dir, DEFAULT_ROOT);
        assert_eq!(config.db_path, DEFAULT_DBPATH);
    }

    #[test]
    fn test_directive_outside_section_rejected() {
        let result = parse_pacman_config("DBPath = /tmp\n");
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_unterminated_section_rejected() {
        let result = parse_pacman_config("[core\n");
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let conf = temp_dir.path().join("pacman.conf");
        fs::write(&conf, "[options]\nDBPath = /tmp/db\n[core]\n[extra]\n").unwrap();

        let config = load_pacman_config(&conf).unwrap();
        assert_eq!(config.path, conf);
        assert_eq!(config.db_path, "/tmp/db");
        assert_eq!(config.repos, vec!["core", "extra"]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_pacman_config(Path::new("/nonexistent/pacman.conf"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
