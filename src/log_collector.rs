//! Decoupled logging pipeline for the backend.
//!
//! ```text
//! log::info!() / log::warn!() ...
//!     |
//! [LogCollector] (non-blocking, any thread or runtime)
//!     | (crossbeam unbounded channel)
//!     v
//! [writer thread] ---> session file (or stderr)
//!     |
//!     +--> frontend channel (tokio mpsc, try_send, optional)
//! ```
//!
//! Writes never wait on the frontend: a full or closed frontend channel only
//! drops the forwarded copy, the line is still persisted.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};

enum LogMessage {
    Line(LogLine),
    /// Flush marker, answered once every earlier line is written
    Flush(tokio::sync::oneshot::Sender<()>),
}

/// A log line with metadata.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    /// `HH:MM:SS.mmm`
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            level,
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// `[HH:MM:SS.mmm] [LEVEL] message`
    pub fn formatted(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// `log::Log` implementation feeding the writer thread.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    session_path: Option<PathBuf>,
    level: LevelFilter,
}

impl LogCollector {
    /// Start the writer thread.
    ///
    /// With a `log_dir`, lines go to a new session file
    /// `backend_<YYYYmmdd_HHMMSS>.log` inside it; otherwise to stderr.
    pub fn new(
        log_dir: Option<&Path>,
        level: LevelFilter,
        frontend_tx: Option<tokio::sync::mpsc::Sender<LogLine>>,
    ) -> io::Result<Self> {
        let (session_path, mut file) = match log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!(
                    "backend_{}.log",
                    Local::now().format("%Y%m%d_%H%M%S")
                ));
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                (Some(path), Some(file))
            }
            None => (None, None),
        };

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread rather than a tokio task: lines logged from any runtime,
        // or from no runtime at all, still reach the sink.
        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            write_line(file.as_mut(), &line);
                            if let Some(frontend) = &frontend_tx {
                                let _ = frontend.try_send(line);
                            }
                        }
                        LogMessage::Flush(done) => {
                            if let Some(file) = file.as_mut() {
                                let _ = file.flush();
                            }
                            let _ = done.send(());
                        }
                    }
                }
            })?;

        Ok(LogCollector {
            tx,
            session_path,
            level,
        })
    }

    /// Session file, if logging to disk.
    pub fn session_log_path(&self) -> Option<&Path> {
        self.session_path.as_deref()
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Queue a line. Never blocks.
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Wait until every line queued before this call has been written.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;

        done_rx
            .await
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

fn write_line(file: Option<&mut File>, line: &LogLine) {
    let formatted = line.formatted();
    match file {
        Some(file) => {
            let _ = writeln!(file, "{}", formatted);
        }
        None => eprintln!("{}", formatted),
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_line(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

/// Install a [`LogCollector`] as the global logger.
///
/// Returns the collector so callers can flush it before exiting.
pub fn init_logging(log_dir: Option<&Path>, level: LevelFilter) -> Result<LogCollector, String> {
    let collector = LogCollector::new(log_dir, level, None)
        .map_err(|e| format!("Failed to start log collector: {}", e))?;

    log::set_boxed_logger(Box::new(collector.clone()))
        .map(|()| log::set_max_level(level))
        .map_err(|e| format!("Failed to set global logger: {}", e))?;

    Ok(collector)
}
