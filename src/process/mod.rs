//! Process lifecycle manager.
//!
//! Tracks at most one child process. The state is owned by the UI thread;
//! background tasks (output reader, shutdown task) only report back through
//! the output queue and never touch it.
//!
//! ```text
//!   Stopped --start--> Running --stop / stream closed--> Stopping --Stopped event--> Stopped
//!                         |                                                            ^
//!                         +------------- stream closed, already exited ---------------+
//! ```
//!
//! Each start gets a new generation number. Notices from an earlier
//! generation are ignored, so a slow reader of a previous process can never
//! reset the state of the current one.

pub mod installer;
pub mod relay;
pub mod terminate;

pub use installer::spawn_install;
pub use relay::{drain, output_queue, spawn_reader};
pub use terminate::{shutdown_child, shutdown_child_with, ShutdownPolicy};

use crate::error::ProcessError;
use crate::models::{RelayEvent, ServiceStatus, StopOutcome};
use crate::system::command::{resolve_command, service_command_line, shell_command};
use crossbeam_channel::Sender;
use std::process::Stdio;
use tokio::process::Child;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// The single tracked child process
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    generation: u64,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Why a shutdown was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user pressed Stop
    Requested,
    /// The output stream closed while the process still looked alive
    StreamClosed,
}

enum ServiceState {
    Stopped,
    Running(ProcessHandle),
    /// The handle was handed to the shutdown task; waiting for its notice
    Stopping {
        pid: Option<u32>,
        generation: u64,
        reason: StopReason,
        task: JoinHandle<()>,
    },
}

/// Returned by a successful start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedService {
    pub pid: Option<u32>,
    pub generation: u64,
    pub command_line: String,
}

/// What the UI has to do after a `StreamClosed` notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamClosedAction {
    /// Stale or unrelated notice
    Ignore,
    /// The process exited on its own; state is back to stopped
    Exited(Option<i32>),
    /// The stream closed but the process lives on; a shutdown was started
    ShuttingDown,
}

/// Owner of the managed child process
pub struct ProcessManager {
    runtime: Handle,
    tx: Sender<RelayEvent>,
    policy: ShutdownPolicy,
    serve_argument: String,
    state: ServiceState,
    next_generation: u64,
}

impl ProcessManager {
    pub fn new(
        runtime: Handle,
        tx: Sender<RelayEvent>,
        policy: ShutdownPolicy,
        serve_argument: impl Into<String>,
    ) -> Self {
        ProcessManager {
            runtime,
            tx,
            policy,
            serve_argument: serve_argument.into(),
            state: ServiceState::Stopped,
            next_generation: 1,
        }
    }

    /// The running flag: true exactly while a live handle is held
    pub fn is_running(&self) -> bool {
        matches!(self.state, ServiceState::Running(_))
    }

    /// True while any process is tracked, including one being torn down
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, ServiceState::Stopped)
    }

    pub fn status(&self) -> ServiceStatus {
        match self.state {
            ServiceState::Stopped => ServiceStatus::NotRunning,
            ServiceState::Running(_) => ServiceStatus::Running,
            ServiceState::Stopping { .. } => ServiceStatus::Stopping,
        }
    }

    /// Pid of the running process, if any
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            ServiceState::Running(handle) => handle.pid(),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<&ProcessHandle> {
        match &self.state {
            ServiceState::Running(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn policy(&self) -> ShutdownPolicy {
        self.policy
    }

    /// Start `<command> <serve argument>`.
    ///
    /// Rejected without side effects if a process is still tracked or the
    /// command does not resolve to an executable.
    pub fn start(&mut self, command: &str) -> Result<StartedService, ProcessError> {
        match &self.state {
            ServiceState::Stopped => {}
            ServiceState::Running(handle) => return Err(ProcessError::AlreadyRunning(handle.pid())),
            ServiceState::Stopping { pid, .. } => return Err(ProcessError::AlreadyRunning(*pid)),
        }

        let command = command.trim();
        if resolve_command(command).is_none() {
            crate::log_warn!("Process", "Command '{}' not found", command);
            return Err(ProcessError::CommandNotFound(command.to_string()));
        }

        let command_line = service_command_line(command, &self.serve_argument);
        let mut cmd = shell_command(&command_line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        let mut child = {
            let _guard = self.runtime.enter();
            cmd.spawn().map_err(|e| ProcessError::SpawnFailed {
                cmd: command_line.clone(),
                reason: e.to_string(),
            })?
        };

        let Some(stdout) = child.stdout.take() else {
            // Never leave an unobserved child behind
            let _ = child.start_kill();
            return Err(ProcessError::OutputUnavailable);
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let pid = child.id();

        spawn_reader(&self.runtime, stdout, self.tx.clone(), generation);

        crate::log_info!(
            "Process",
            "Started '{}' (pid {:?}, generation {})",
            command_line,
            pid,
            generation
        );

        self.state = ServiceState::Running(ProcessHandle {
            child,
            pid,
            generation,
        });

        Ok(StartedService {
            pid,
            generation,
            command_line,
        })
    }

    /// Begin the tiered shutdown of the running process.
    ///
    /// Returns immediately; completion arrives as `RelayEvent::Stopped`.
    pub fn stop(&mut self) -> Result<(), ProcessError> {
        if !self.is_running() {
            return Err(ProcessError::NotRunning);
        }
        self.begin_shutdown(StopReason::Requested);
        Ok(())
    }

    fn begin_shutdown(&mut self, reason: StopReason) {
        let handle = match std::mem::replace(&mut self.state, ServiceState::Stopped) {
            ServiceState::Running(handle) => handle,
            other => {
                self.state = other;
                return;
            }
        };

        let ProcessHandle {
            mut child,
            pid,
            generation,
        } = handle;
        let policy = self.policy;
        crate::log_info!("Process", "Stopping pid {:?} ({:?})", pid, reason);

        let shutdown = self
            .runtime
            .spawn(async move { shutdown_child(&mut child, policy).await });

        // Separate watcher so a panicking shutdown still produces a notice
        let tx = self.tx.clone();
        let task = self.runtime.spawn(async move {
            let outcome = match shutdown.await {
                Ok(outcome) => outcome,
                Err(e) => StopOutcome::Failed(format!("Shutdown task failed: {}", e)),
            };
            let _ = tx.send(RelayEvent::Stopped {
                generation,
                outcome,
            });
        });

        self.state = ServiceState::Stopping {
            pid,
            generation,
            reason,
            task,
        };
    }

    /// Apply a `StreamClosed` notice from the reader of `generation`
    pub fn handle_stream_closed(&mut self, generation: u64) -> StreamClosedAction {
        let ServiceState::Running(handle) = &mut self.state else {
            return StreamClosedAction::Ignore;
        };
        if handle.generation != generation {
            return StreamClosedAction::Ignore;
        }

        match handle.child.try_wait() {
            Ok(Some(status)) => {
                crate::log_info!(
                    "Process",
                    "Process {:?} exited with {:?}",
                    handle.pid,
                    status.code()
                );
                self.state = ServiceState::Stopped;
                StreamClosedAction::Exited(status.code())
            }
            Ok(None) | Err(_) => {
                self.begin_shutdown(StopReason::StreamClosed);
                StreamClosedAction::ShuttingDown
            }
        }
    }

    /// Apply a `Stopped` notice. Returns why the shutdown had been started,
    /// or `None` if the notice is stale.
    pub fn handle_stopped(&mut self, generation: u64) -> Option<StopReason> {
        match &self.state {
            ServiceState::Stopping {
                generation: current,
                reason,
                ..
            } if *current == generation => {
                let reason = *reason;
                self.state = ServiceState::Stopped;
                Some(reason)
            }
            _ => None,
        }
    }

    /// Stop whatever is tracked and wait for it, for use when the app exits.
    ///
    /// Must not be called from inside the runtime.
    pub fn shutdown_blocking(&mut self) -> Option<StopOutcome> {
        let state = std::mem::replace(&mut self.state, ServiceState::Stopped);
        match state {
            ServiceState::Stopped => None,
            ServiceState::Running(mut handle) => {
                crate::log_info!("Process", "Stopping pid {:?} before exit", handle.pid);
                let policy = self.policy;
                let outcome = self
                    .runtime
                    .block_on(async { shutdown_child(&mut handle.child, policy).await });
                Some(outcome)
            }
            ServiceState::Stopping { task, .. } => {
                let _ = self.runtime.block_on(task);
                None
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::relay::output_queue;
    use crossbeam_channel::Receiver;
    use std::time::Duration;

    fn manager(runtime: &tokio::runtime::Runtime) -> (ProcessManager, Receiver<RelayEvent>) {
        let (tx, rx) = output_queue();
        let policy = ShutdownPolicy {
            attempts: 3,
            interval: Duration::from_millis(100),
        };
        (ProcessManager::new(runtime.handle().clone(), tx, policy, "serve"), rx)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_missing_command_is_rejected() {
        let rt = runtime();
        let (mut mgr, rx) = manager(&rt);
        let err = mgr.start("nonexistent_binary_123").unwrap_err();
        assert!(matches!(err, ProcessError::CommandNotFound(_)));
        assert!(!mgr.is_running());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_when_not_running() {
        let rt = runtime();
        let (mut mgr, _rx) = manager(&rt);
        assert!(matches!(mgr.stop(), Err(ProcessError::NotRunning)));
        assert_eq!(mgr.status(), ServiceStatus::NotRunning);
    }

    #[test]
    fn test_stale_notices_are_ignored() {
        let rt = runtime();
        let (mut mgr, _rx) = manager(&rt);
        assert_eq!(mgr.handle_stream_closed(42), StreamClosedAction::Ignore);
        assert_eq!(mgr.handle_stopped(42), None);
    }

    #[test]
    fn test_shutdown_blocking_with_nothing_running() {
        let rt = runtime();
        let (mut mgr, _rx) = manager(&rt);
        assert_eq!(mgr.shutdown_blocking(), None);
    }
}
