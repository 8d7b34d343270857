//! Kernel service: catalog queries plus lifecycle operations behind one
//! handle, the way the frontend bridge uses them.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::catalog::PackageCatalog;
use crate::error::{CatalogError, LifecycleError};
use crate::kernel::inventory::{build_inventory, detect_running_kernel, RunningKernel};
use crate::kernel::manager::{KernelLifecycleManager, PendingOutcome};
use crate::kernel::sink::CompletionSink;
use crate::models::{Kernel, KernelCatalogEntry};
use crate::transaction::TransactionEngine;

/// Catalog calls are blocking (they may spawn pacman); async callers should
/// run them on the blocking pool.
pub struct KernelService {
    catalog: Mutex<Box<dyn PackageCatalog>>,
    manager: KernelLifecycleManager,
    running: Option<RunningKernel>,
}

impl KernelService {
    /// Create the service, refreshing the catalog if it has no snapshot yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        mut catalog: Box<dyn PackageCatalog>,
        engine: Arc<dyn TransactionEngine>,
        sink: Arc<dyn CompletionSink>,
    ) -> Result<Self, CatalogError> {
        if !catalog.is_refreshed() {
            catalog.refresh()?;
        }

        Ok(KernelService {
            catalog: Mutex::new(catalog),
            manager: KernelLifecycleManager::new(engine, sink),
            running: detect_running_kernel(),
        })
    }

    /// Override the detected running kernel.
    pub fn with_running_kernel(mut self, running: Option<RunningKernel>) -> Self {
        self.running = running;
        self
    }

    pub fn running_kernel(&self) -> Option<RunningKernel> {
        self.running
    }

    fn lock_catalog(&self) -> Result<MutexGuard<'_, Box<dyn PackageCatalog>>, CatalogError> {
        self.catalog
            .lock()
            .map_err(|_| CatalogError::DatabaseUnavailable("Catalog lock poisoned".to_string()))
    }

    /// Reload the repository snapshot.
    pub fn refresh(&self) -> Result<(), CatalogError> {
        let mut catalog = self.lock_catalog()?;
        catalog.refresh()
    }

    /// Kernel packages offered by the repositories, in catalog order.
    pub fn search(&self) -> Result<Vec<KernelCatalogEntry>, CatalogError> {
        let catalog = self.lock_catalog()?;
        catalog.search_kernel_packages()
    }

    /// Full kernel inventory, newest first.
    pub fn kernels(&self) -> Result<Vec<Kernel>, CatalogError> {
        let catalog = self.lock_catalog()?;

        let repo = catalog.search_kernel_packages()?;
        let installed = catalog.installed_kernel_packages()?;
        let kernels = build_inventory(&repo, &installed, self.running.as_ref());

        log::info!(
            "[Kernel] Inventory: {} kernels ({} installed)",
            kernels.len(),
            kernels.iter().filter(|k| k.installed).count()
        );
        Ok(kernels)
    }

    pub fn install(&self, name: &str) -> Result<PendingOutcome, LifecycleError> {
        self.manager.install_kernel(name)
    }

    pub fn remove(&self, name: &str) -> Result<PendingOutcome, LifecycleError> {
        self.manager.remove_kernel(name)
    }

    pub fn manager(&self) -> &KernelLifecycleManager {
        &self.manager
    }

    /// Finish queued operations and stop the lifecycle worker.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}
