//! Tiered shutdown of the managed process.
//!
//! 1. If the process already exited, skip signalling.
//! 2. Send a graceful termination request (SIGTERM on Unix).
//! 3. Poll the exit status every `interval`, at most `attempts` times.
//! 4. Force-kill if it is still alive.
//!
//! Every path ends in a `StopOutcome`; failures are reported in it and never
//! leave the caller holding the process.

use crate::config::ControllerSettings;
use crate::error::ProcessError;
use crate::models::StopOutcome;
use std::time::Duration;
use tokio::process::Child;

/// How long to wait for a graceful exit before force-killing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        ShutdownPolicy {
            attempts: 5,
            interval: Duration::from_millis(500),
        }
    }
}

impl ShutdownPolicy {
    pub fn from_settings(settings: &ControllerSettings) -> Self {
        ShutdownPolicy {
            attempts: settings.stop_attempts.max(1),
            interval: settings.stop_poll_interval(),
        }
    }

    /// Upper bound on the graceful window
    pub fn grace_period(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// Ask the process to terminate gracefully
#[cfg(unix)]
pub fn send_terminate(child: &mut Child) -> Result<(), ProcessError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // `id()` is None once the child has been reaped
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let raw = i32::try_from(pid).map_err(|e| ProcessError::SignalFailed {
        pid,
        reason: e.to_string(),
    })?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|errno| ProcessError::SignalFailed {
        pid,
        reason: errno.desc().to_string(),
    })
}

/// Ask the process to terminate. Windows has no graceful signal for a
/// console child, so this is the same as a kill request.
#[cfg(not(unix))]
pub fn send_terminate(child: &mut Child) -> Result<(), ProcessError> {
    let pid = child.id().unwrap_or_default();
    child.start_kill().map_err(|e| ProcessError::SignalFailed {
        pid,
        reason: e.to_string(),
    })
}

/// Run the tiered shutdown to completion
pub async fn shutdown_child(child: &mut Child, policy: ShutdownPolicy) -> StopOutcome {
    shutdown_child_with(child, policy, send_terminate).await
}

/// Tiered shutdown with a custom graceful-termination step
pub async fn shutdown_child_with<F>(child: &mut Child, policy: ShutdownPolicy, terminate: F) -> StopOutcome
where
    F: FnOnce(&mut Child) -> Result<(), ProcessError>,
{
    let pid = child.id();

    match child.try_wait() {
        Ok(Some(status)) => {
            log::info!("[Process] Process {:?} already exited with {:?}", pid, status.code());
            return StopOutcome::AlreadyExited(status.code());
        }
        Ok(None) => {}
        Err(e) => log::warn!("[Process] Could not query exit status of {:?}: {}", pid, e),
    }

    if let Err(e) = terminate(child) {
        // The process may have exited between the status check and the signal
        if let Ok(Some(status)) = child.try_wait() {
            return StopOutcome::AlreadyExited(status.code());
        }
        log::error!("[Process] {}", e);
        return match child.kill().await {
            Ok(()) => StopOutcome::Failed(e.to_string()),
            Err(kill_err) => StopOutcome::Failed(format!("{}; kill failed: {}", e, kill_err)),
        };
    }
    log::info!("[Process] Sent termination request to {:?}", pid);

    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                log::info!(
                    "[Process] Process {:?} exited after {} poll(s) with {:?}",
                    pid,
                    attempt,
                    status.code()
                );
                return StopOutcome::Terminated(status.code());
            }
            Ok(None) => {}
            Err(e) => log::warn!("[Process] Exit status poll failed: {}", e),
        }
    }

    log::warn!(
        "[Process] Process {:?} still alive after {:?}, force-killing",
        pid,
        policy.grace_period()
    );
    match child.kill().await {
        Ok(()) => StopOutcome::Killed,
        Err(e) => StopOutcome::Failed(format!("Failed to kill process: {}", e)),
    }
}
