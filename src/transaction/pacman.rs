//! Transaction engine that drives pacman through a privilege helper.

use std::io;
use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::config::PACMAN_CONFIG_PATH;
use crate::error::TransactionError;
use crate::models::{TransactionKind, TransactionRequest};
use crate::system::command::{display_command, log_output, run_captured, CommandOutput};
use crate::transaction::{validate_targets, TransactionEngine};

const PACMAN: &str = "pacman";

/// Runs each request as one pacman invocation, so all targets of a request
/// succeed or fail together.
///
/// The privileged process runs on tokio's blocking pool; `execute` itself
/// only builds the command line.
#[derive(Debug, Clone)]
pub struct PacmanEngine {
    privilege_helper: Option<String>,
    config_path: PathBuf,
}

impl PacmanEngine {
    /// Engine using `helper` (e.g. `pkexec`) to gain root, or none.
    pub fn new(privilege_helper: Option<&str>) -> Self {
        PacmanEngine {
            privilege_helper: privilege_helper.map(str::to_string),
            config_path: PathBuf::from(PACMAN_CONFIG_PATH),
        }
    }

    /// Program and argv for a request.
    pub fn command_line(
        &self,
        request: &TransactionRequest,
    ) -> Result<(String, Vec<String>), TransactionError> {
        validate_targets(request)?;

        let mut args: Vec<String> = Vec::new();
        let program = match &self.privilege_helper {
            Some(helper) => {
                args.push(PACMAN.to_string());
                helper.clone()
            }
            None => PACMAN.to_string(),
        };

        args.push("--config".to_string());
        args.push(self.config_path.to_string_lossy().to_string());
        match request.kind() {
            // --needed keeps an already-current kernel from being reinstalled
            TransactionKind::Install => args.extend(["-S", "--needed"].map(String::from)),
            TransactionKind::Remove => args.push("-Rns".to_string()),
        }
        args.push("--noconfirm".to_string());
        // End of options: targets are never parsed as flags
        args.push("--".to_string());
        args.extend(request.targets().iter().cloned());

        Ok((program, args))
    }
}

impl Default for PacmanEngine {
    fn default() -> Self {
        Self::new(Some("pkexec"))
    }
}

impl TransactionEngine for PacmanEngine {
    fn execute(&self, request: TransactionRequest) -> BoxFuture<'static, bool> {
        let command = self.command_line(&request);

        Box::pin(async move {
            let (program, args) = match command {
                Ok(command) => command,
                Err(e) => {
                    log::error!("[Engine] Request {} rejected: {}", request.id(), e);
                    return false;
                }
            };

            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let line = display_command(&program, &arg_refs);
            log::info!("[Engine] Request {} ({}): {}", request.id(), request.kind(), line);

            let result = tokio::task::spawn_blocking(move || {
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                run_captured(&program, &arg_refs)
            })
            .await;

            let checked = result
                .map_err(|e| TransactionError::Worker(e.to_string()))
                .and_then(|output| check_output(&line, output));
            match checked {
                Ok(()) => {
                    log::info!("[Engine] Request {} finished successfully", request.id());
                    true
                }
                Err(e) => {
                    log::error!("[Engine] Request {}: {}", request.id(), e);
                    false
                }
            }
        })
    }
}

/// Log the output of a finished pacman run and turn a spawn failure or a
/// non-zero exit into `TransactionError::Command`.
fn check_output(line: &str, output: io::Result<CommandOutput>) -> Result<(), TransactionError> {
    let output = output.map_err(|e| TransactionError::Command {
        cmd: line.to_string(),
        reason: e.to_string(),
    })?;

    log_output("pacman", &output);
    if output.success() {
        return Ok(());
    }
    let reason = match output.status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    Err(TransactionError::Command {
        cmd: line.to_string(),
        reason,
    })
}
