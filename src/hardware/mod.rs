//! Host resource sampling.
//!
//! `ResourceSampler` produces one `ResourceSnapshot` per cycle from three
//! independent sources:
//! - CPU and memory counters via `sysinfo`
//! - the cached reading of the background GPU probe (`gpu::GpuMonitor`)
//! - the resident memory of the managed process, when one is running
//!
//! A failure in any one source substitutes a default for that field; sampling
//! itself never fails.

pub mod gpu;

pub use gpu::{
    parse_nvidia_smi, parse_system_profiler, select_provider, GpuMonitor, MetricsProvider,
    NvidiaSmiProvider, SystemProfilerProvider, UnavailableProvider, GPU_INSTALL_HINT,
    NOT_AVAILABLE,
};

use crate::models::{MemoryUsage, ResourceSnapshot};
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Resource sampler owned by the UI controller.
///
/// CPU usage is computed by `sysinfo` as a delta between refreshes, so the
/// first snapshot after construction may report 0%.
pub struct ResourceSampler {
    system: System,
    gpu: GpuMonitor,
}

impl ResourceSampler {
    pub fn new(gpu: GpuMonitor) -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first real cycle has a baseline
        system.refresh_cpu_usage();
        ResourceSampler { system, gpu }
    }

    /// Take one snapshot. `pid` is the managed process, if running.
    pub fn sample(&mut self, pid: Option<u32>) -> ResourceSnapshot {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = sanitize_percent(self.system.global_cpu_usage());
        let memory = MemoryUsage::new(self.system.total_memory(), self.system.used_memory());
        let process_rss = pid.and_then(|pid| self.process_rss(pid));

        ResourceSnapshot {
            cpu_percent,
            memory,
            gpu: self.gpu.latest(),
            process_rss,
            taken_at: Instant::now(),
        }
    }

    /// Resident memory of `pid` in bytes.
    ///
    /// Returns `None` when the process vanished between the liveness check
    /// and the read.
    pub fn process_rss(&mut self, pid: u32) -> Option<u64> {
        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let rss = self.system.process(pid).map(|p| p.memory());
        if rss.is_none() {
            log::debug!("[Sampler] Process {} not found while reading memory", pid);
        }
        rss
    }

    /// Stop the GPU probe worker
    pub fn shutdown(&mut self) {
        self.gpu.stop();
    }
}

fn sanitize_percent(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
