//! Unified error type hierarchy for the control panel backend
//!
//! Provides structured error handling with CatalogError, TransactionError,
//! LifecycleError, HardwareError, ConfigError, and AppError.
//!
//! Transaction failures never reach callers through these types: a failed
//! package transaction is reported as a `false` outcome only.

use std::io;
use thiserror::Error;

/// Package catalog (repository snapshot) errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog has not been refreshed")]
    NotRefreshed,

    #[error("Package database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Command '{cmd}' failed: {reason}")]
    Command { cmd: String, reason: String },

    #[error("Catalog configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while preparing a transaction for the engine.
///
/// These are logged by the engine and collapse to an unsuccessful outcome.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction has no targets")]
    NoTargets,

    #[error("Invalid package target: {0}")]
    InvalidTarget(String),

    #[error("Command '{cmd}' failed: {reason}")]
    Command { cmd: String, reason: String },

    #[error("Transaction worker failed: {0}")]
    Worker(String),
}

/// Kernel lifecycle manager errors (submission side only).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Kernel package name is empty")]
    EmptyName,

    #[error("Lifecycle manager is shut down")]
    Closed,
}

/// Hardware enumeration and driver configuration errors.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Device bus unavailable: {0}")]
    BusUnavailable(String),

    #[error("Enumeration session already closed")]
    SessionClosed,

    #[error("Invalid driver configuration {path}: {reason}")]
    InvalidConfig { path: String, reason: String },
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type for the backend services.
///
/// Provides unified error categorization and user-facing messages for the
/// frontend bridge.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// OS command failed (e.g., pacman, uname, pkexec)
    #[error("Command '{cmd}' failed: {reason}")]
    OsCommand { cmd: String, reason: String },

    /// Package catalog could not be loaded or queried
    #[error("Package catalog error: {0}")]
    Catalog(String),

    /// Hardware enumeration failed
    #[error("Hardware enumeration failed: {0}")]
    Hardware(String),

    /// Settings persist or deserialize error
    #[error("Settings error: {0}")]
    Settings(String),

    /// Invalid input (e.g., empty package name)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Kernel operation could not be queued
    #[error("Kernel operation rejected: {0}")]
    Lifecycle(String),

    /// Kernel transaction ran but did not succeed
    #[error("Kernel {operation} of {name} failed")]
    TransactionFailed { operation: String, name: String },

    /// Logging could not be started
    #[error("Logging initialization failed: {0}")]
    Logging(String),

    /// Output could not be written or encoded
    #[error("Output error: {0}")]
    Output(String),

    /// Background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl AppError {
    /// Get a user-facing error message suitable for UI display
    pub fn user_message(&self) -> String {
        match self {
            AppError::OsCommand { cmd, reason } => {
                format!("Failed to execute '{}': {}", cmd, reason)
            }
            AppError::Catalog(msg) => format!("Could not read package repositories: {}", msg),
            AppError::Hardware(msg) => format!("Could not list hardware devices: {}", msg),
            AppError::Settings(msg) => format!("Settings error: {}", msg),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
            AppError::Lifecycle(msg) => format!("Kernel operation not started: {}", msg),
            AppError::TransactionFailed { operation, name } => {
                format!("Kernel {} of {} failed, see the log for details", operation, name)
            }
            AppError::Logging(msg) => format!("Could not start logging: {}", msg),
            AppError::Output(msg) => format!("Could not write output: {}", msg),
            AppError::Task(msg) => format!("Internal task failed: {}", msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Command { cmd, reason } => AppError::OsCommand { cmd, reason },
            other => AppError::Catalog(other.to_string()),
        }
    }
}

impl From<HardwareError> for AppError {
    fn from(e: HardwareError) -> Self {
        AppError::Hardware(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Settings(e.to_string())
    }
}

impl From<LifecycleError> for AppError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::EmptyName => AppError::InvalidInput(e.to_string()),
            LifecycleError::Closed => AppError::Lifecycle(e.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Output(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Output(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Task(e.to_string())
    }
}

/// Top-level result type for backend service operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::DatabaseUnavailable("/var/lib/pacman".to_string());
        assert_eq!(
            err.to_string(),
            "Package database unavailable: /var/lib/pacman"
        );
        assert_eq!(
            CatalogError::NotRefreshed.to_string(),
            "Catalog has not been refreshed"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::FileNotFound("/etc/pacman.conf".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /etc/pacman.conf"
        );
    }

    #[test]
    fn test_catalog_command_error_maps_to_os_command() {
        let err: AppError = CatalogError::Command {
            cmd: "pacman -Sl".to_string(),
            reason: "exit status 1".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::OsCommand { .. }));
        assert_eq!(
            err.user_message(),
            "Failed to execute 'pacman -Sl': exit status 1"
        );
    }

    #[test]
    fn test_lifecycle_error_mapping() {
        let empty: AppError = LifecycleError::EmptyName.into();
        assert!(matches!(empty, AppError::InvalidInput(_)));

        let closed: AppError = LifecycleError::Closed.into();
        assert!(matches!(closed, AppError::Lifecycle(_)));
    }

    #[test]
    fn test_transaction_failed_message() {
        let err = AppError::TransactionFailed {
            operation: "install".to_string(),
            name: "linux61".to_string(),
        };
        assert_eq!(err.to_string(), "Kernel install of linux61 failed");
        assert_eq!(
            err.user_message(),
            "Kernel install of linux61 failed, see the log for details"
        );
    }

    #[test]
    fn test_output_errors_map_to_output() {
        let io_err: AppError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(io_err, AppError::Output(_)));

        let json_err: AppError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(json_err, AppError::Output(_)));
        assert!(json_err.user_message().starts_with("Could not write output:"));
    }

    #[tokio::test]
    async fn test_join_error_maps_to_task() {
        let join_err = tokio::spawn(async { panic!("worker died") }).await.unwrap_err();
        let err: AppError = join_err.into();
        assert!(matches!(err, AppError::Task(_)));
    }

    #[test]
    fn test_config_error_maps_to_settings() {
        let err: AppError = ConfigError::ValidationFailed("Unknown log level 'loud'".to_string()).into();
        assert_eq!(
            err.user_message(),
            "Settings error: Configuration validation failed: Unknown log level 'loud'"
        );
    }
}
