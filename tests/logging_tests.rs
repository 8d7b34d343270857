//! Global logging integration test.
//!
//! Kept in its own test binary: the global logger can be installed once per
//! process.

use std::fs;
use std::sync::Arc;

use control_panel_backend::{
    init_logging, KernelLifecycleManager, LogSink, TransactionEngine, TransactionRequest,
};
use futures::future::BoxFuture;
use log::LevelFilter;
use tempfile::TempDir;

struct AlwaysFails;

impl TransactionEngine for AlwaysFails {
    fn execute(&self, _request: TransactionRequest) -> BoxFuture<'static, bool> {
        Box::pin(async { false })
    }
}

#[tokio::test]
async fn test_backend_logs_reach_session_file() {
    let temp_dir = TempDir::new().unwrap();
    let collector = init_logging(Some(temp_dir.path()), LevelFilter::Info).unwrap();

    // Second install must be refused
    assert!(init_logging(None, LevelFilter::Info).is_err());

    let manager = KernelLifecycleManager::new(Arc::new(AlwaysFails), Arc::new(LogSink));
    let outcome = manager.install_kernel("linux999").unwrap().wait().await;
    manager.shutdown().await;
    assert!(!outcome.success);

    log::debug!("[Test] below the level filter");
    collector.wait_for_empty().await.unwrap();

    let path = collector.session_log_path().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("backend_") && name.ends_with(".log"));

    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("[WARN] [Lifecycle]"));
    assert!(!content.contains("below the level filter"));
}
