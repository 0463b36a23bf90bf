//! WebUI Controller
//!
//! A desktop control panel that launches, monitors and stops a single local
//! web service (by default `open-webui serve`), shows live CPU, memory and GPU
//! metrics, and streams the service's console output into a log view.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures shared across modules
//! - **config**: Read-only settings with defaults
//! - **system**: Command resolution and shell invocation
//! - **process**: Lifecycle manager, output relay, tiered shutdown, installer
//! - **hardware**: Resource sampler and GPU metrics providers
//! - **ui**: AppController and egui integration
//! - **log_collector**: Diagnostic logging backend

// Core foundational modules
pub mod error;
pub mod models;

// Settings
pub mod config;

// Command resolution and logging macros
pub mod system;

// Child process lifecycle and output relay
pub mod process;

// Resource sampling and GPU providers
pub mod hardware;

// UI controller and egui integration
pub mod ui;

// Decoupled diagnostic logging
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{ConfigError, MetricsError, ProcessError, Result};

pub use models::{
    format_bytes, GpuSample, InstallOutcome, MemoryUsage, RelayEvent, ResourceSnapshot,
    ServiceStatus, StopOutcome,
};

pub use config::{ControllerSettings, SettingsManager};

pub use hardware::{GpuMonitor, MetricsProvider, ResourceSampler};

pub use process::{ProcessManager, ShutdownPolicy};

pub use ui::AppController;

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
        let _ = ProcessError::NotRunning;
    }

    #[test]
    fn test_models_reexport() {
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(ServiceStatus::Running, ServiceStatus::Running);
    }
}
