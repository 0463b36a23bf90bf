//! GPU metrics providers.
//!
//! One `MetricsProvider` is selected at startup based on the platform and the
//! tools available:
//! - macOS: `system_profiler SPDisplaysDataType` (name, Metal, VRAM)
//! - elsewhere: `nvidia-smi` for the first enumerated device
//! - otherwise: a provider that always reports "unavailable"
//!
//! Providers shell out and may take a noticeable time, so `GpuMonitor` runs
//! them on a worker thread and caches the latest sample for the sampler.

use crate::error::MetricsError;
use crate::models::GpuSample;
use crate::system::command::resolve_command;
use crossbeam_channel::{bounded, Sender};
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Command;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

static VRAM_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(GB|MB)?").ok());

/// Reason reported when no telemetry source exists
pub const NOT_AVAILABLE: &str = "Not available";

/// Hint shown under the GPU rows when no telemetry source exists
pub const GPU_INSTALL_HINT: &str = "Install NVIDIA drivers (nvidia-smi) for GPU metrics";

/// Source of GPU telemetry.
///
/// Implementations report a uniform `GpuSample`; fields they cannot read are
/// left as `None`.
pub trait MetricsProvider: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Take one GPU sample. May block on an external tool.
    fn sample_gpu(&mut self) -> Result<GpuSample, MetricsError>;
}

/// Choose the provider for this platform once, at startup
pub fn select_provider() -> Box<dyn MetricsProvider> {
    if cfg!(target_os = "macos") {
        log::info!("[GPU] Using system_profiler for GPU information");
        return Box::new(SystemProfilerProvider::default());
    }
    if resolve_command("nvidia-smi").is_some() {
        log::info!("[GPU] Using nvidia-smi for GPU metrics");
        return Box::new(NvidiaSmiProvider);
    }
    log::info!("[GPU] No GPU telemetry source found");
    Box::new(UnavailableProvider::new(NOT_AVAILABLE))
}

/// Provider used when no telemetry source exists
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableProvider { reason: reason.into() }
    }
}

impl MetricsProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn sample_gpu(&mut self) -> Result<GpuSample, MetricsError> {
        Ok(GpuSample::unavailable(self.reason.clone()))
    }
}

/// macOS provider backed by `system_profiler`.
///
/// Chipset, Metal support and VRAM do not change while the app runs, so the
/// first successful parse is cached and reused.
#[derive(Default)]
pub struct SystemProfilerProvider {
    cached: Option<GpuSample>,
}

impl MetricsProvider for SystemProfilerProvider {
    fn name(&self) -> &'static str {
        "system_profiler"
    }

    fn sample_gpu(&mut self) -> Result<GpuSample, MetricsError> {
        if let Some(ref sample) = self.cached {
            return Ok(sample.clone());
        }
        let output = run_tool("system_profiler", &["SPDisplaysDataType"])?;
        let sample = parse_system_profiler(&output);
        self.cached = Some(sample.clone());
        Ok(sample)
    }
}

/// NVIDIA provider backed by `nvidia-smi`
pub struct NvidiaSmiProvider;

impl MetricsProvider for NvidiaSmiProvider {
    fn name(&self) -> &'static str {
        "nvidia-smi"
    }

    fn sample_gpu(&mut self) -> Result<GpuSample, MetricsError> {
        let output = run_tool(
            "nvidia-smi",
            &[
                "--query-gpu=name,utilization.gpu,memory.used,memory.total",
                "--format=csv,noheader,nounits",
            ],
        )?;
        parse_nvidia_smi(&output)
    }
}

fn run_tool(tool: &str, args: &[&str]) -> Result<String, MetricsError> {
    let output = Command::new(tool).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MetricsError::ToolUnavailable(tool.to_string())
        } else {
            MetricsError::CommandFailed {
                tool: tool.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !output.status.success() {
        return Err(MetricsError::CommandFailed {
            tool: tool.to_string(),
            reason: format!("exit status {:?}", output.status.code()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `system_profiler SPDisplaysDataType` output.
///
/// Each field is best-effort: a line that fails to parse leaves its field
/// unset. Only the first chipset entry is used.
pub fn parse_system_profiler(output: &str) -> GpuSample {
    let mut sample = GpuSample {
        name: "Unknown GPU".to_string(),
        available: true,
        ..Default::default()
    };
    let mut seen_chipset = false;

    for line in output.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        if key.contains("Chipset Model") {
            if seen_chipset {
                break;
            }
            seen_chipset = true;
            if !value.is_empty() {
                sample.name = value.to_string();
            }
        } else if key.starts_with("Metal") {
            sample.metal_supported = Some(metal_value_supported(value));
        } else if key.contains("VRAM") {
            if let Some(mb) = parse_vram_mb(value) {
                sample.memory_total_mb = Some(mb);
            }
        }
    }

    sample
}

/// "Supported", "Metal 3", "Metal Family: Supported, Metal GPUFamily macOS 2"
fn metal_value_supported(value: &str) -> bool {
    let lower = value.to_lowercase();
    if lower.contains("not supported") || lower.contains("unsupported") {
        return false;
    }
    lower.contains("supported") || lower.starts_with("metal")
}

/// Parse a VRAM field such as "8 GB", "1536 MB" or "Dynamic, Max: 1536 MB"
pub fn parse_vram_mb(value: &str) -> Option<f64> {
    let re = VRAM_RE.as_ref()?;
    let caps = re.captures(value)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2).map(|m| m.as_str().to_uppercase()) {
        Some(unit) if unit == "GB" => Some(amount * 1024.0),
        _ => Some(amount),
    }
}

/// Parse the first line of
/// `nvidia-smi --query-gpu=name,utilization.gpu,memory.used,memory.total --format=csv,noheader,nounits`.
///
/// Numeric fields reported as `[N/A]` (or otherwise unparsable) are left unset.
pub fn parse_nvidia_smi(output: &str) -> Result<GpuSample, MetricsError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(MetricsError::NoDevice)?;

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(MetricsError::Parse(format!("nvidia-smi output '{}'", line)));
    }

    let number = |s: &str| s.parse::<f64>().ok();
    Ok(GpuSample {
        name: fields[0].to_string(),
        utilization: number(fields[1]).map(|u| u as f32),
        memory_used_mb: number(fields[2]),
        memory_total_mb: number(fields[3]),
        metal_supported: None,
        available: true,
        reason: None,
    })
}

/// Convert a provider result into a sample the UI can always render
pub fn sample_or_unavailable(result: Result<GpuSample, MetricsError>) -> GpuSample {
    match result {
        Ok(sample) => sample,
        Err(MetricsError::NoDevice) => GpuSample::unavailable("No GPU detected"),
        Err(e) => GpuSample::unavailable(format!("Error: {}", e)),
    }
}

/// Longest `GpuMonitor::stop` waits for an in-flight probe
pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Background GPU probe with a cached latest sample.
///
/// The worker calls the provider at a fixed interval and stops when the
/// monitor is dropped or `stop()` is called.
pub struct GpuMonitor {
    latest: Arc<RwLock<GpuSample>>,
    stop_tx: Option<Sender<()>>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl GpuMonitor {
    pub fn spawn(mut provider: Box<dyn MetricsProvider>, interval: Duration) -> Self {
        let latest = Arc::new(RwLock::new(GpuSample::unavailable("Detecting GPU...")));
        let latest_clone = Arc::clone(&latest);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker = std::thread::Builder::new()
            .name("gpu-probe".to_string())
            .spawn(move || {
                let mut last_error: Option<String> = None;
                loop {
                    let result = provider.sample_gpu();
                    if let Err(ref e) = result {
                        let msg = e.to_string();
                        if last_error.as_deref() != Some(msg.as_str()) {
                            log::warn!("[GPU] {} probe failed: {}", provider.name(), msg);
                            last_error = Some(msg);
                        }
                    } else {
                        last_error = None;
                    }
                    let sample = sample_or_unavailable(result);
                    if let Ok(mut slot) = latest_clone.write() {
                        *slot = sample;
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                log::debug!("[GPU] Probe worker stopped");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("[GPU] Failed to spawn probe worker: {}", e);
                if let Ok(mut slot) = latest.write() {
                    *slot = GpuSample::unavailable("GPU probe unavailable");
                }
                None
            }
        };

        GpuMonitor {
            latest,
            stop_tx: Some(stop_tx),
            worker,
        }
    }

    /// Latest cached sample; never blocks on the provider
    pub fn latest(&self) -> GpuSample {
        self.latest
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|_| GpuSample::unavailable("GPU data unavailable"))
    }

    /// Stop the worker.
    ///
    /// Waits at most `STOP_JOIN_TIMEOUT` for the current probe to finish; a
    /// probe stuck in an external tool is detached and exits on its own.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the worker's receiver
        self.stop_tx.take();
        let Some(handle) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                log::debug!("[GPU] Probe still running, detaching worker");
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = handle.join();
    }
}

impl Drop for GpuMonitor {
    fn drop(&mut self) {
        self.stop_tx.take();
    }
}
