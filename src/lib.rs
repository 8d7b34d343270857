//! Control Panel Rust Backend
//!
//! Backend services for a system control panel on pacman-based
//! distributions: installing and removing kernels together with their
//! headers, listing the kernels the repositories offer, and enumerating
//! USB/PCI hardware with its driver configurations.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **catalog**: Repository snapshot of kernel packages
//! - **transaction**: Engine contract and the pacman engine
//! - **kernel**: Kernel lifecycle manager, completion sinks, inventory
//! - **hardware**: USB/PCI enumeration and driver configuration matching
//! - **language**: Installed and available language packs per application
//! - **config**: pacman configuration and backend settings
//! - **system**: OS command execution
//! - **log_collector**: Decoupled logging pipeline

// Core foundational modules
pub mod error;
pub mod models;

pub mod catalog;
pub mod config;
pub mod hardware;
pub mod kernel;
pub mod language;
pub mod system;
pub mod transaction;

// Decoupled logging pipeline
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{init_logging, LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{
    AppError, CatalogError, ConfigError, HardwareError, LifecycleError, Result, TransactionError,
};

pub use models::{
    HwDevice, HwKind, Kernel, KernelCatalogEntry, KernelPackageName, PackagePair, RequestId,
    TransactionKind, TransactionOutcome, TransactionRequest, HEADERS_SUFFIX,
};

pub use catalog::{MemoryCatalog, PackageCatalog, PacmanCatalog, KERNEL_PACKAGE_PATTERN};
pub use hardware::{DeviceLister, EnumerationSession, HardwareService, SysfsDeviceLister};
pub use kernel::{
    CompletionSink, KernelLifecycleManager, KernelService, LogSink, PendingOutcome,
};
pub use language::{detect_language_packs, LanguagePackage};
pub use transaction::{PacmanEngine, TransactionEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let _: Result<i32> = Ok(42);
        let err: AppError = LifecycleError::EmptyName.into();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_models_reexport() {
        assert_eq!(KernelPackageName::from("linux61").pair().headers(), "linux61-headers");
        assert_eq!(HEADERS_SUFFIX, "-headers");
    }
}
