//! Decoupled diagnostic logging for the controller.
//!
//! Every `log::*!` call in the crate ends up here. Records are handed to a
//! background writer thread over an unbounded crossbeam channel, so logging
//! never blocks the UI thread.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / log::warn!() / ...
//!     |
//! [LogCollector] (log::Log impl, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [Writer thread]
//!     |-- stderr (always)
//!     |-- log file (only if configured)
//! ```
//!
//! The collector is installed before the settings are read, so it starts on
//! stderr only. Lines written before `reconfigure` attaches a log file are
//! kept (up to `STARTUP_BACKLOG`) and replayed into the file first.
//!
//! The user-facing log view is a separate buffer owned by the UI controller;
//! this pipeline only carries diagnostics.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Lines kept for the log file until `reconfigure` runs
pub const STARTUP_BACKLOG: usize = 256;

/// Internal log line or special marker
enum LogMessage {
    /// Regular log line
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
    /// Switch the file target; ends startup buffering
    Attach(Option<File>),
}

/// A diagnostic log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: log::Level,
    /// Timestamp of when the record was created
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: log::Level, message: String) -> Self {
        LogLine {
            message,
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// Render the line as written to stderr and disk
    pub fn formatted(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Unified logger that hands records to the background writer
#[derive(Clone)]
pub struct LogCollector {
    /// Channel sender for log lines - crossbeam unbounded for cross-runtime reliability
    tx: Sender<LogMessage>,
    level: Arc<RwLock<log::LevelFilter>>,
    log_file: Arc<RwLock<Option<PathBuf>>>,
}

impl LogCollector {
    /// Create a new LogCollector and spawn its writer thread.
    ///
    /// If `log_file` is given, its parent directory is created and every line
    /// is appended to it in addition to stderr.
    pub fn new(level: log::LevelFilter, log_file: Option<PathBuf>) -> Result<Self, String> {
        let mut file = match &log_file {
            Some(path) => Some(open_log_file(path)?),
            None => None,
        };
        // Only a collector started without a file buffers for a later one
        let mut backlog: Option<Vec<String>> = file.is_none().then(Vec::new);

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: works before the runtime exists and after it shuts down
        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            let formatted = line.formatted();
                            eprintln!("{}", formatted);
                            if let Some(ref mut f) = file {
                                let _ = writeln!(f, "{}", formatted);
                            } else if let Some(ref mut lines) = backlog {
                                if lines.len() < STARTUP_BACKLOG {
                                    lines.push(formatted);
                                }
                            }
                        }
                        LogMessage::Attach(new_file) => {
                            file = new_file;
                            let pending = backlog.take().unwrap_or_default();
                            if let Some(ref mut f) = file {
                                for line in pending {
                                    let _ = writeln!(f, "{}", line);
                                }
                            }
                        }
                        LogMessage::Flush(done) => {
                            if let Some(ref mut f) = file {
                                let _ = f.flush();
                            }
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|e| format!("Failed to spawn log writer thread: {}", e))?;

        Ok(LogCollector {
            tx,
            level: Arc::new(RwLock::new(level)),
            log_file: Arc::new(RwLock::new(log_file)),
        })
    }

    /// Register this collector as the global logger for the `log` crate
    pub fn init_global_logger(self) -> Result<(), log::SetLoggerError> {
        let level = self.level();
        log::set_boxed_logger(Box::new(self)).map(|()| log::set_max_level(level))
    }

    /// Apply the level and log file from the loaded settings.
    ///
    /// Affects every clone, including the one installed as global logger.
    /// On a file error the level is still applied and logging stays on
    /// stderr.
    pub fn reconfigure(&self, level: log::LevelFilter, log_file: Option<PathBuf>) -> Result<(), String> {
        if let Ok(mut slot) = self.level.write() {
            *slot = level;
        }
        log::set_max_level(level);

        let (file, path) = match log_file {
            Some(path) => match open_log_file(&path) {
                Ok(file) => (Some(file), Some(path)),
                Err(e) => {
                    let _ = self.tx.send(LogMessage::Attach(None));
                    return Err(e);
                }
            },
            None => (None, None),
        };
        if let Ok(mut slot) = self.log_file.write() {
            *slot = path;
        }
        self.tx
            .send(LogMessage::Attach(file))
            .map_err(|e| format!("Failed to reach log writer: {}", e))
    }

    pub fn level(&self) -> log::LevelFilter {
        self.level.read().map(|l| *l).unwrap_or(log::LevelFilter::Info)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.read().ok().and_then(|p| p.clone())
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Send a simple info-level string
    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(log::Level::Info, message.into()));
    }

    /// Wait for all pending lines to be written.
    ///
    /// Sends a FLUSH marker down the channel and blocks until the writer
    /// thread has processed everything queued before it.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

/// Implementation of the `log` crate's Log trait
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_line(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

fn open_log_file(path: &Path) -> Result<File, String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create log directory: {}", e))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}
