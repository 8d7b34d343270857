//! Catalog read directly from the libalpm databases.

use std::path::Path;

use ::alpm::{Alpm, SigLevel};

use crate::catalog::{
    collect_kernel_entries, filter_installed_kernels, InstalledPackages, PackageCatalog,
    RepoPackage,
};
use crate::config::{load_pacman_config, PacmanConfig, PACMAN_CONFIG_PATH};
use crate::error::CatalogError;
use crate::models::KernelCatalogEntry;

/// Repository snapshot taken through libalpm.
///
/// The ALPM handle is not `Send`, so each refresh opens a short-lived handle,
/// copies what it needs into owned values and drops the handle again.
pub struct AlpmCatalog {
    config: PacmanConfig,
    repo_packages: Option<Vec<RepoPackage>>,
    installed: InstalledPackages,
}

impl AlpmCatalog {
    /// Open the catalog using the system pacman configuration.
    pub fn open() -> Result<Self, CatalogError> {
        let config = load_pacman_config(Path::new(PACMAN_CONFIG_PATH))?;
        if !Path::new(&config.db_path).exists() {
            return Err(CatalogError::DatabaseUnavailable(format!(
                "Database path does not exist: {}",
                config.db_path
            )));
        }

        Ok(AlpmCatalog {
            config,
            repo_packages: None,
            installed: InstalledPackages::new(),
        })
    }

    fn create_handle(&self) -> Result<Alpm, CatalogError> {
        let handle = Alpm::new(self.config.root_dir.clone(), self.config.db_path.clone())
            .map_err(|e| {
                CatalogError::DatabaseUnavailable(format!("Failed to initialize ALPM: {}", e))
            })?;

        let siglevel = SigLevel::PACKAGE_OPTIONAL | SigLevel::DATABASE_OPTIONAL;
        for repo in self.config.repo_names() {
            if let Err(e) = handle.register_syncdb(repo, siglevel) {
                log::warn!("[Catalog] Failed to register {}: {}", repo, e);
            } else {
                log::debug!("[Catalog] Registered sync database: {}", repo);
            }
        }

        Ok(handle)
    }
}

impl PackageCatalog for AlpmCatalog {
    fn refresh(&mut self) -> Result<(), CatalogError> {
        let handle = self.create_handle()?;

        let mut packages = Vec::new();
        for db in handle.syncdbs() {
            for pkg in db.pkgs() {
                packages.push(RepoPackage::new(
                    db.name(),
                    pkg.name(),
                    pkg.version().as_str(),
                ));
            }
        }

        let installed: InstalledPackages = handle
            .localdb()
            .pkgs()
            .iter()
            .map(|pkg| (pkg.name().to_string(), pkg.version().as_str().to_string()))
            .collect();

        log::info!(
            "[Catalog] ALPM snapshot refreshed: {} repository packages, {} installed",
            packages.len(),
            installed.len()
        );

        self.repo_packages = Some(packages);
        self.installed = installed;
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
