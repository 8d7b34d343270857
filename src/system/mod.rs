/// System module: OS command execution with captured, locale-neutral output

pub mod command;

pub use command::{display_command, log_output, run_captured, CommandOutput};

/// Logging macros for convenient access
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::info!("{}", msg);
    }}
}

/// Log a failed OS command together with its stderr.
#[macro_export]
macro_rules! log_command_failure {
    ($tag:expr, $cmd:expr, $output:expr) => {{
        log::error!(
            "[{}] '{}' exited with {:?}: {}",
            $tag,
            $cmd,
            $output.status,
            $output.stderr.trim()
        );
    }};
}
