//! Unified error type hierarchy for WebUI Controller
//!
//! Provides structured error handling with ProcessError, MetricsError and
//! ConfigError. None of these are fatal to the application: every variant is
//! reported in the log view and the UI stays responsive.

use std::io;
use thiserror::Error;

/// Service lifecycle errors (start, stop, install).
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Command '{0}' not found")]
    CommandNotFound(String),

    #[error("Service is already running (pid {0:?})")]
    AlreadyRunning(Option<u32>),

    #[error("Service is not running")]
    NotRunning,

    #[error("Failed to spawn '{cmd}': {reason}")]
    SpawnFailed { cmd: String, reason: String },

    #[error("Child process has no captured output stream")]
    OutputUnavailable,

    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },
}

/// Resource metric collection errors.
///
/// These are always recovered from per field: the sampler substitutes a
/// default and keeps polling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("{0} is not available on this system")]
    ToolUnavailable(String),

    #[error("{tool} failed: {reason}")]
    CommandFailed { tool: String, reason: String },

    #[error("Could not parse {0}")]
    Parse(String),

    #[error("No GPU detected")]
    NoDevice,
}

/// Settings file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during settings operations: {0}")]
    IoError(#[from] io::Error),
}

impl ProcessError {
    /// Get a user-facing error message suitable for the log view
    pub fn user_message(&self) -> String {
        match self {
            ProcessError::CommandNotFound(cmd) => format!("Error: Command '{}' not found", cmd),
            ProcessError::AlreadyRunning(_) => "Service is already running".to_string(),
            ProcessError::NotRunning => "Service is not running".to_string(),
            ProcessError::SpawnFailed { reason, .. } => format!("Error starting service: {}", reason),
            ProcessError::OutputUnavailable => {
                "Error starting service: output stream unavailable".to_string()
            }
            ProcessError::SignalFailed { reason, .. } => format!("Error stopping service: {}", reason),
        }
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
