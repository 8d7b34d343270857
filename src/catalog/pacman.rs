//! Catalog backed by the pacman command line tool.
//!
//! `refresh` re-reads the synchronized repository databases already on disk
//! (`pacman -Sl`) and the local database (`pacman -Q`). It does not download
//! new databases from mirrors.

use std::path::Path;

use crate::catalog::{
    collect_kernel_entries, filter_installed_kernels, InstalledPackages, PackageCatalog,
    RepoPackage,
};
use crate::config::{load_pacman_config, PacmanConfig, PACMAN_CONFIG_PATH};
use crate::error::CatalogError;
use crate::models::KernelCatalogEntry;
use crate::system::command::{display_command, run_captured};

const PACMAN: &str = "pacman";

/// Repository snapshot taken from pacman.
pub struct PacmanCatalog {
    config: PacmanConfig,
    repo_packages: Option<Vec<RepoPackage>>,
    installed: InstalledPackages,
}

impl PacmanCatalog {
    /// Open the catalog using the system pacman configuration.
    pub fn open() -> Result<Self, CatalogError> {
        Self::open_with_config(Path::new(PACMAN_CONFIG_PATH))
    }

    fn open_with_config(path: &Path) -> Result<Self, CatalogError> {
        let config = load_pacman_config(path)?;
        if !Path::new(&config.db_path).exists() {
            return Err(CatalogError::DatabaseUnavailable(format!(
                "Database path does not exist: {}",
                config.db_path
            )));
        }

        log::info!(
            "[Catalog] Opened pacman catalog ({} repositories: {})",
            config.repos.len(),
            config.repo_names().join(", ")
        );

        Ok(PacmanCatalog {
            config,
            repo_packages: None,
            installed: InstalledPackages::new(),
        })
    }

    pub fn config(&self) -> &PacmanConfig {
        &self.config
    }

    fn run_pacman(&self, operation: &str) -> Result<String, CatalogError> {
        let config_path = self.config.path.to_string_lossy().to_string();
        let args = ["--config", config_path.as_str(), operation];
        let cmd = display_command(PACMAN, &args);

        let output = run_captured(PACMAN, &args).map_err(|e| CatalogError::Command {
            cmd: cmd.clone(),
            reason: e.to_string(),
        })?;

        if !output.success() {
            return Err(CatalogError::Command {
                cmd,
                reason: format!(
                    "exit status {:?}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            });
        }

        Ok(output.stdout)
    }
}

impl PackageCatalog for PacmanCatalog {
    fn refresh(&mut self) -> Result<(), CatalogError> {
        let listing = self.run_pacman("-Sl")?;
        let local = self.run_pacman("-Q")?;

        let packages = parse_sync_listing(&listing);
        self.installed = parse_local_listing(&local);

        log::info!(
            "[Catalog] Snapshot refreshed: {} repository packages, {} installed",
            packages.len(),
            self.installed.len()
        );
        self.repo_packages = Some(packages);
        Ok(())
    }

    fn is_refreshed(&self) -> bool {
        self.repo_packages.is_some()
    }

    fn search_kernel_packages(&self) -> Result<Vec<KernelCatalogEntry>, CatalogError> {
        let packages = self
            .repo_packages
            .as_ref()
            .ok_or(CatalogError::NotRefreshed)?;
        Ok(collect_kernel_entries(packages, &self.installed))
    }

    fn installed_kernel_packages(&self) -> Result<InstalledPackages, CatalogError> {
        if !self.is_refreshed() {
            return Err(CatalogError::NotRefreshed);
        }
        Ok(filter_installed_kernels(&self.installed))
    }
}

/// Parse `pacman -Sl` output: `<repo> <name> <version> [installed...]`.
pub fn parse_sync_listing(output: &str) -> Vec<RepoPackage> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let repo = parts.next()?;
            let name = parts.next()?;
            let version = parts.next()?;
            Some(RepoPackage::new(repo, name, version))
        })
        .collect()
}

/// Parse `pacman -Q` output: `<name> <version>`.
pub fn parse_local_listing(output: &str) -> InstalledPackages {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.next()?;
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNC_LISTING: &str = "\
core linux61 6.1.80-1 [installed]
core linux61-headers 6.1.80-1
core linux66 6.6.21-1
extra linux54-rt 5.4.264_rt88-1 [installed: 5.4.263_rt87-1]
extra firefox 124.0-1
truncated-line
";

    const LOCAL_LISTING: &str = "\
acl 2.3.2-1
linux61 6.1.80-1
linux61-nvidia 550.54.14-2
linux54-rt 5.4.263_rt87-1
";

    #[test]
    fn test_parse_sync_listing() {
        let packages = parse_sync_listing(SYNC_LISTING);
        assert_eq!(packages.len(), 5);
        assert_eq!(packages[0], RepoPackage::new("core", "linux61", "6.1.80-1"));
        assert_eq!(packages[3].version, "5.4.264_rt88-1");
    }

    #[test]
    fn test_parse_local_listing() {
        let installed = parse_local_listing(LOCAL_LISTING);
        assert_eq!(installed.len(), 4);
        assert_eq!(installed.get("linux61-nvidia").map(String::as_str), Some("550.54.14-2"));
    }

    #[test]
    fn test_listing_to_kernel_entries() {
        let packages = parse_sync_listing(SYNC_LISTING);
        let installed = parse_local_listing(LOCAL_LISTING);
        let entries = collect_kernel_entries(&packages, &installed);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["linux61", "linux66", "linux54-rt"]);
        assert!(entries[0].installed);
        assert!(!entries[1].installed);
        assert!(entries[2].installed);
    }

    #[test]
    fn test_installed_kernels_exclude_unrelated() {
        let installed = filter_installed_kernels(&parse_local_listing(LOCAL_LISTING));
        assert!(!installed.contains_key("acl"));
        assert!(installed.contains_key("linux61-nvidia"));
        assert_eq!(installed.len(), 3);
    }

    #[test]
    fn test_open_with_missing_config() {
        let result = PacmanCatalog::open_with_config(Path::new("/nonexistent/pacman.conf"));
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }
}
