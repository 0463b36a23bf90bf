//! Core data structures shared between the lifecycle manager, the output
//! relay, the resource sampler and the UI.

use chrono::Local;
use std::time::Instant;

/// Format a timestamp prefix for user-facing log lines: `[YYYY-mm-dd HH:MM:SS]`
pub fn timestamp() -> String {
    format!("[{}]", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Prefix a message with the current timestamp
pub fn stamped(message: impl AsRef<str>) -> String {
    format!("{} {}", timestamp(), message.as_ref())
}

/// Format a byte count into a human-readable string (base 1024, one decimal).
///
/// ```
/// use webui_controller::models::format_bytes;
/// assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}

/// High-level service status shown next to the Start/Stop buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    NotRunning,
    Running,
    Stopping,
    /// Stop finished but signalling or killing raised an error
    Error,
}

impl ServiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::NotRunning => "Status: Not Running",
            ServiceStatus::Running => "Status: Running",
            ServiceStatus::Stopping => "Status: Stopping...",
            ServiceStatus::Error => "Status: Error",
        }
    }
}

/// Result of the tiered shutdown procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process had already exited before any signal was sent
    AlreadyExited(Option<i32>),
    /// The process exited within the graceful window
    Terminated(Option<i32>),
    /// The process ignored the graceful signal and was force-killed
    Killed,
    /// Signalling or killing failed; the handle is released regardless
    Failed(String),
}

/// Result of an installer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Installer exited; `None` means it was terminated by a signal
    Exited(Option<i32>),
    /// Installer could not be run at all
    Failed(String),
}

impl InstallOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, InstallOutcome::Exited(Some(0)))
    }
}

/// Messages delivered through the output queue to the UI thread.
///
/// Background contexts never touch controller state directly; everything
/// they have to say arrives here.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A line of console output (or an already formatted log line)
    Line(String),
    /// The reader for the given start generation reached end-of-stream
    StreamClosed { generation: u64 },
    /// The shutdown task for the given start generation finished
    Stopped { generation: u64, outcome: StopOutcome },
    /// The installer finished
    InstallFinished(InstallOutcome),
}

/// Host memory usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
}

impl MemoryUsage {
    pub fn new(total: u64, used: u64) -> Self {
        MemoryUsage { total, used }
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64 * 100.0) as f32
    }

    /// Label for the memory row, e.g. `50.0% (8.0 GB)`
    pub fn label(&self) -> String {
        format!("{:.1}% ({})", self.percent(), format_bytes(self.used))
    }
}

/// Uniform GPU reading produced by every metrics provider.
///
/// Fields a provider cannot determine stay `None`; utilization in particular
/// is unknown on macOS and must not be replaced by a placeholder value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GpuSample {
    pub name: String,
    /// Utilization percentage (0-100)
    pub utilization: Option<f32>,
    pub memory_used_mb: Option<f64>,
    pub memory_total_mb: Option<f64>,
    /// Metal capability (macOS only)
    pub metal_supported: Option<bool>,
    pub available: bool,
    /// Why the sample is unavailable, shown in place of the metrics
    pub reason: Option<String>,
}

impl GpuSample {
    /// A sample that reports no GPU data, with zero-value gauges
    pub fn unavailable(reason: impl Into<String>) -> Self {
        GpuSample {
            name: String::new(),
            available: false,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn utilization_label(&self) -> String {
        if !self.available {
            return self.reason.clone().unwrap_or_else(|| "Not available".to_string());
        }
        match self.utilization {
            Some(util) => format!("{:.1}% ({})", util, self.name),
            None => format!("Active: {}", self.name),
        }
    }

    /// Fraction for the utilization gauge; `None` when utilization is unknown
    pub fn utilization_fraction(&self) -> Option<f32> {
        if !self.available {
            return Some(0.0);
        }
        self.utilization.map(|u| (u / 100.0).clamp(0.0, 1.0))
    }

    pub fn memory_percent(&self) -> Option<f64> {
        match (self.memory_used_mb, self.memory_total_mb) {
            (Some(used), Some(total)) if total > 0.0 => Some(used / total * 100.0),
            _ => None,
        }
    }

    pub fn memory_label(&self) -> String {
        if !self.available {
            return self.reason.clone().unwrap_or_else(|| "Not available".to_string());
        }
        if let (Some(pct), Some(used), Some(total)) =
            (self.memory_percent(), self.memory_used_mb, self.memory_total_mb)
        {
            return format!("{:.1}% ({:.0} MB / {:.0} MB)", pct, used, total);
        }
        if let Some(total) = self.memory_total_mb {
            return format!("VRAM: {:.0} MB", total);
        }
        match self.metal_supported {
            Some(true) => "Metal Support: Yes".to_string(),
            Some(false) => "Metal Support: No".to_string(),
            None => "Memory unknown".to_string(),
        }
    }

    pub fn memory_fraction(&self) -> Option<f32> {
        if !self.available {
            return Some(0.0);
        }
        self.memory_percent().map(|p| (p / 100.0).clamp(0.0, 1.0) as f32)
    }
}

/// One cycle of resource metrics. Never persisted; replaced every cycle.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub gpu: GpuSample,
    /// Resident memory of the managed process, if running and readable
    pub process_rss: Option<u64>,
    pub taken_at: Instant,
}

impl ResourceSnapshot {
    pub fn cpu_label(&self) -> String {
        format!("{:.1}%", self.cpu_percent)
    }

    pub fn cpu_fraction(&self) -> f32 {
        (self.cpu_percent / 100.0).clamp(0.0, 1.0)
    }

    pub fn memory_fraction(&self) -> f32 {
        (self.memory.percent() / 100.0).clamp(0.0, 1.0)
    }

    pub fn process_memory_label(&self) -> String {
        self.process_rss
            .map(format_bytes)
            .unwrap_or_else(|| "N/A".to_string())
    }
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        ResourceSnapshot {
            cpu_percent: 0.0,
            memory: MemoryUsage::default(),
            gpu: GpuSample::unavailable("Not available"),
            process_rss: None,
            taken_at: Instant::now(),
        }
    }
}
