//! AppController: UI-thread owner of all controller state
//!
//! Holds the settings, the process manager, the output queue receiver, the log
//! view buffer, the command field and the latest resource snapshot. Background
//! tasks only ever send `RelayEvent`s; this struct is the single place where
//! those events change state.

use crate::config::ControllerSettings;
use crate::error::ProcessError;
use crate::hardware::ResourceSampler;
use crate::log_info;
use crate::models::{stamped, InstallOutcome, RelayEvent, ResourceSnapshot, ServiceStatus, StopOutcome};
use crate::process::{
    drain, output_queue, spawn_install, ProcessManager, ShutdownPolicy, StopReason,
    StreamClosedAction,
};
use crate::system::command::{check_command, CommandStatus};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use super::threading::TimerSet;

pub const MSG_STARTED: &str = "Application started";
pub const MSG_SERVICE_STARTED: &str = "OpenWebUI service started";
pub const MSG_SERVICE_STOPPED: &str = "OpenWebUI service stopped";
pub const MSG_PROCESS_EXITED: &str = "Process exited";
pub const MSG_INSTALLING: &str = "Installing OpenWebUI...";
pub const MSG_INSTALLED: &str = "OpenWebUI installed successfully";
pub const MSG_NOT_FOUND_HINT: &str =
    "Please check if OpenWebUI is installed correctly or specify the full path to the executable";

/// Central controller driven by the egui frame loop
pub struct AppController {
    settings: ControllerSettings,
    runtime: Handle,
    manager: ProcessManager,
    sampler: ResourceSampler,
    tx: Sender<RelayEvent>,
    rx: Receiver<RelayEvent>,

    log_lines: VecDeque<String>,
    command_text: String,
    command_status: CommandStatus,
    installing: bool,
    /// Set when the last shutdown reported an error; cleared on the next start
    stop_failed: bool,

    snapshot: ResourceSnapshot,
    timers: TimerSet,
    shut_down: bool,
}

impl AppController {
    pub fn new(settings: ControllerSettings, runtime: Handle, sampler: ResourceSampler) -> Self {
        let (tx, rx) = output_queue();
        let manager = ProcessManager::new(
            runtime.clone(),
            tx.clone(),
            ShutdownPolicy::from_settings(&settings),
            settings.serve_argument.clone(),
        );
        let timers = TimerSet::new(
            settings.resource_interval(),
            settings.drain_interval(),
            settings.command_check_interval(),
            Instant::now(),
        );

        let mut controller = AppController {
            command_text: settings.command.clone(),
            settings,
            runtime,
            manager,
            sampler,
            tx,
            rx,
            log_lines: VecDeque::new(),
            command_status: CommandStatus::Unknown,
            installing: false,
            stop_failed: false,
            snapshot: ResourceSnapshot::default(),
            timers,
            shut_down: false,
        };

        controller.append_log(MSG_STARTED);
        controller.recheck_command();
        controller
    }

    // ---- read-only view state ----

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn log_lines(&self) -> &VecDeque<String> {
        &self.log_lines
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn command_status(&self) -> &CommandStatus {
        &self.command_status
    }

    pub fn snapshot(&self) -> &ResourceSnapshot {
        &self.snapshot
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    pub fn is_installing(&self) -> bool {
        self.installing
    }

    pub fn manager(&self) -> &ProcessManager {
        &self.manager
    }

    pub fn status(&self) -> ServiceStatus {
        match self.manager.status() {
            ServiceStatus::NotRunning if self.stop_failed => ServiceStatus::Error,
            status => status,
        }
    }

    pub fn can_start(&self) -> bool {
        !self.manager.is_busy() && self.command_status.is_found()
    }

    pub fn can_stop(&self) -> bool {
        self.manager.is_running()
    }

    /// Install only waits for a previous installation, not for the service
    pub fn can_install(&self) -> bool {
        !self.installing
    }

    /// Sender for the output queue, for producers outside the controller
    pub fn output_sender(&self) -> Sender<RelayEvent> {
        self.tx.clone()
    }

    // ---- actions ----

    /// Append a timestamped message to the log view
    pub fn append_log(&mut self, message: impl AsRef<str>) {
        self.push_line(stamped(message));
    }

    fn push_line(&mut self, line: String) {
        self.log_lines.push_back(line);
        while self.log_lines.len() > self.settings.max_log_lines {
            self.log_lines.pop_front();
        }
    }

    /// Start the service with the current command field
    pub fn start_service(&mut self) {
        // Validity is never cached: resolve again right before spawning
        self.recheck_command();
        let command = self.command_text.trim().to_string();

        match self.manager.start(&command) {
            Ok(started) => {
                self.stop_failed = false;
                self.append_log(format!("Executing: {}", started.command_line));
                self.append_log(MSG_SERVICE_STARTED);
            }
            Err(ProcessError::AlreadyRunning(pid)) => {
                log::debug!("[UI] Start ignored, service already tracked (pid {:?})", pid);
            }
            Err(e @ ProcessError::CommandNotFound(_)) => {
                self.append_log(e.user_message());
                self.append_log(MSG_NOT_FOUND_HINT);
            }
            Err(e) => {
                log::error!("[UI] {}", e);
                self.append_log(e.user_message());
            }
        }
    }

    /// Begin a graceful stop; completion arrives through the queue
    pub fn stop_service(&mut self) {
        match self.manager.stop() {
            Ok(()) => log_info!("UI", "Stop requested"),
            Err(e) => log::debug!("[UI] Stop ignored: {}", e),
        }
    }

    /// Run the install command in the background
    pub fn install(&mut self) {
        if !self.can_install() {
            log::debug!("[UI] Install ignored, installation already running");
            return;
        }
        self.installing = true;
        self.append_log(MSG_INSTALLING);
        spawn_install(&self.runtime, &self.settings.install_command, self.tx.clone());
    }

    /// Command field edited: re-check after the debounce delay
    pub fn set_command(&mut self, text: String) {
        if text == self.command_text {
            return;
        }
        self.command_text = text;
        self.timers
            .command_check
            .trigger_after(self.settings.recheck_debounce(), Instant::now());
    }

    /// Command picked with the file dialog: re-check immediately
    pub fn set_command_from_path(&mut self, path: &Path) {
        self.command_text = path.display().to_string();
        self.recheck_command();
    }

    pub fn recheck_command(&mut self) {
        let status = check_command(&self.command_text);
        if status != self.command_status {
            log::debug!("[UI] Command '{}': {}", self.command_text.trim(), status.label());
        }
        self.command_status = status;
    }

    /// Take one resource snapshot
    pub fn sample_resources(&mut self) {
        self.snapshot = self.sampler.sample(self.manager.pid());
    }

    /// Apply everything currently in the output queue
    pub fn drain_output(&mut self) -> usize {
        let events = drain(&self.rx);
        let count = events.len();
        for event in events {
            self.apply_event(event);
        }
        count
    }

    fn apply_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Line(line) => self.push_line(line),
            RelayEvent::StreamClosed { generation } => {
                match self.manager.handle_stream_closed(generation) {
                    StreamClosedAction::Ignore => {}
                    StreamClosedAction::Exited(code) => {
                        log_info!("UI", "Service exited on its own with {:?}", code);
                        self.snapshot.process_rss = None;
                        self.append_log(MSG_PROCESS_EXITED);
                    }
                    StreamClosedAction::ShuttingDown => {
                        log::warn!("[UI] Output closed while process alive, stopping it");
                    }
                }
            }
            RelayEvent::Stopped { generation, outcome } => {
                let Some(reason) = self.manager.handle_stopped(generation) else {
                    return;
                };
                self.snapshot.process_rss = None;
                self.report_stop(reason, outcome);
            }
            RelayEvent::InstallFinished(outcome) => self.report_install(outcome),
        }
    }

    fn report_stop(&mut self, reason: StopReason, outcome: StopOutcome) {
        match (outcome, reason) {
            (StopOutcome::Failed(e), _) => {
                self.stop_failed = true;
                self.append_log(format!("Error stopping service: {}", e));
            }
            (_, StopReason::StreamClosed) => self.append_log(MSG_PROCESS_EXITED),
            (_, StopReason::Requested) => self.append_log(MSG_SERVICE_STOPPED),
        }
    }

    fn report_install(&mut self, outcome: InstallOutcome) {
        self.installing = false;
        match outcome {
            InstallOutcome::Exited(Some(0)) => {
                self.append_log(MSG_INSTALLED);
                self.recheck_command();
            }
            InstallOutcome::Exited(Some(code)) => {
                self.append_log(format!("Installation failed with return code {}", code));
            }
            InstallOutcome::Exited(None) => {
                self.append_log("Installation failed: installer was terminated by a signal");
            }
            InstallOutcome::Failed(e) => {
                self.append_log(format!("Installation error: {}", e));
            }
        }
    }

    /// Run every due timer. Returns the delay until the next one.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let due = self.timers.poll(now);
        if due.drain {
            self.drain_output();
        }
        if due.sample {
            self.sample_resources();
        }
        if due.command_check {
            self.recheck_command();
        }
        self.timers.next_wakeup(now)
    }

    /// Window is closing: cancel timers, stop the service and wait for it
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.timers.cancel_all();

        if let Some(outcome) = self.manager.shutdown_blocking() {
            log_info!("UI", "Service stopped on exit: {:?}", outcome);
            self.append_log(MSG_SERVICE_STOPPED);
        }
        self.drain_output();
        self.sampler.shutdown();
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        if !self.shut_down && self.manager.is_busy() {
            log::warn!("[UI] Controller dropped with a live service, stopping it");
            // Only safe outside the runtime; block_on panics inside it
            if Handle::try_current().is_err() {
                self.shutdown();
            }
        }
    }
}
