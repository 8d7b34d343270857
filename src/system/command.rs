//! Locale-neutral command execution with captured output.

use std::process::{Command, Output};

/// Environment forced on every child so output parsing is locale independent.
const C_LOCALE_ENV: [(&str, &str); 3] = [("LANG", "C"), ("LC_MESSAGES", "C"), ("LC_ALL", "C")];

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn from_output(output: Output) -> Self {
        CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Render a program and its arguments for log lines and error messages.
pub fn display_command(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run `program` with `args` under the C locale and capture its output.
///
/// Arguments are passed as separate argv entries, never through a shell.
/// Returns `Err` only when the process could not be spawned; a non-zero exit
/// status is reported through [`CommandOutput::status`].
pub fn run_captured(program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in C_LOCALE_ENV {
        command.env(key, value);
    }

    let output = command.output()?;
    Ok(CommandOutput::from_output(output))
}

/// Forward non-empty stdout/stderr of a finished command to the log.
pub fn log_output(tag: &str, output: &CommandOutput) {
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        log::info!("[{}] stdout: {}", tag, stdout);
    }

    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        log::info!("[{}] stderr: {}", tag, stderr);
    }
}
