//! Kernel Management Module
//!
//! Handles the kernel side of the control panel, including:
//! - Install/remove transactions for a kernel and its headers
//! - Completion reporting for those transactions
//! - The kernel inventory (repository, installed, running, end of life)

pub mod inventory;
pub mod manager;
pub mod service;
pub mod sink;
pub mod version;

pub use inventory::{build_inventory, detect_running_kernel, RunningKernel, LTS_KERNELS, RECOMMENDED_KERNELS};
pub use manager::{KernelLifecycleManager, PendingOutcome};
pub use service::KernelService;
pub use sink::{CompletionSink, FnSink, LogSink};
pub use version::{is_newer, newest_first, KernelVersion};
