//! AppController scenarios, driven the way the egui frame loop drives it
//!
//! The controller is exercised without a window: the test owns a runtime,
//! calls the same action methods the buttons call and ticks the timers until
//! the expected state shows up.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use webui_controller::config::ControllerSettings;
use webui_controller::hardware::{GpuMonitor, ResourceSampler, UnavailableProvider};
use webui_controller::models::ServiceStatus;
use webui_controller::ui::AppController;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn test_settings(command: &str) -> ControllerSettings {
    ControllerSettings {
        command: command.to_string(),
        drain_interval_ms: 10,
        resource_interval_ms: 50,
        stop_poll_interval_ms: 100,
        stop_attempts: 5,
        ..Default::default()
    }
}

fn controller(rt: &tokio::runtime::Runtime, settings: ControllerSettings) -> AppController {
    let gpu = GpuMonitor::spawn(
        Box::new(UnavailableProvider::new("Not available")),
        Duration::from_millis(50),
    );
    AppController::new(settings, rt.handle().clone(), ResourceSampler::new(gpu))
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Tick the controller until `done` holds
fn tick_until(ctrl: &mut AppController, timeout: Duration, done: impl Fn(&AppController) -> bool) {
    let deadline = Instant::now() + timeout;
    while !done(ctrl) {
        assert!(Instant::now() < deadline, "controller never reached the expected state");
        ctrl.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn log_contains(ctrl: &AppController, needle: &str) -> bool {
    ctrl.log_lines().iter().any(|l| l.contains(needle))
}

#[test]
fn test_startup_logs_and_checks_command() {
    let rt = runtime();
    let ctrl = controller(&rt, test_settings("sh"));
    assert!(log_contains(&ctrl, "Application started"));
    assert!(ctrl.log_lines()[0].starts_with('['));
    assert!(ctrl.command_status().is_found());
    assert!(ctrl.can_start());
    assert!(!ctrl.can_stop());
    assert_eq!(ctrl.status(), ServiceStatus::NotRunning);
}

#[test]
fn test_nonexistent_command_start_is_noop() {
    println!("[TEST] nonexistent_binary_123 -> Start");
    let rt = runtime();
    let mut ctrl = controller(&rt, test_settings("nonexistent_binary_123"));
    assert!(!ctrl.can_start());

    ctrl.start_service();
    assert!(log_contains(&ctrl, "not found"));
    assert!(log_contains(&ctrl, "specify the full path"));
    assert!(!ctrl.is_running());
    assert!(!ctrl.can_stop());
    assert_eq!(ctrl.status(), ServiceStatus::NotRunning);
}

#[test]
fn test_start_then_stop_resets_controls() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-webui", "echo \"Uvicorn running ($1)\"\nexec sleep 30");
    let mut ctrl = controller(&rt, test_settings(script.to_str().unwrap()));

    ctrl.start_service();
    assert!(ctrl.is_running());
    assert!(!ctrl.can_start());
    assert!(ctrl.can_stop());
    assert!(ctrl.can_install());
    assert!(log_contains(&ctrl, "Executing: "));
    assert!(log_contains(&ctrl, "OpenWebUI service started"));

    tick_until(&mut ctrl, Duration::from_secs(5), |c| log_contains(c, "Uvicorn running (serve)"));
    tick_until(&mut ctrl, Duration::from_secs(5), |c| c.snapshot().process_rss.is_some());
    assert_ne!(ctrl.snapshot().process_memory_label(), "N/A");

    ctrl.stop_service();
    assert_eq!(ctrl.status(), ServiceStatus::Stopping);
    assert!(!ctrl.can_start());
    assert!(!ctrl.can_stop());

    tick_until(&mut ctrl, Duration::from_secs(5), |c| c.status() == ServiceStatus::NotRunning);
    assert!(log_contains(&ctrl, "OpenWebUI service stopped"));
    assert!(ctrl.can_start());
    assert!(!ctrl.can_stop());
    assert_eq!(ctrl.snapshot().process_memory_label(), "N/A");
}

#[test]
fn test_child_exit_resets_without_stop() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "crashy", "echo starting\nsleep 0.2\nexit 7");
    let mut ctrl = controller(&rt, test_settings(script.to_str().unwrap()));

    ctrl.start_service();
    assert!(ctrl.is_running());

    tick_until(&mut ctrl, Duration::from_secs(5), |c| !c.manager().is_busy());
    assert!(log_contains(&ctrl, "Process exited"));
    assert!(ctrl.can_start());
    assert!(!ctrl.can_stop());
    assert_eq!(ctrl.status(), ServiceStatus::NotRunning);
}

#[test]
fn test_install_success_rechecks_command() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("installed-webui");
    let settings = ControllerSettings {
        install_command: format!(
            "echo Collecting; printf '#!/bin/sh\\n' > '{0}'; chmod +x '{0}'",
            target.display()
        ),
        ..test_settings(target.to_str().unwrap())
    };
    let mut ctrl = controller(&rt, settings);
    assert!(!ctrl.command_status().is_found());

    ctrl.install();
    assert!(ctrl.is_installing());
    assert!(!ctrl.can_install());
    assert!(log_contains(&ctrl, "Installing OpenWebUI..."));

    tick_until(&mut ctrl, Duration::from_secs(5), |c| !c.is_installing());
    assert!(log_contains(&ctrl, "Collecting"));
    assert!(log_contains(&ctrl, "OpenWebUI installed successfully"));
    assert!(ctrl.command_status().is_found());
    assert!(ctrl.can_start());
}

#[test]
fn test_install_failure_reports_code() {
    let rt = runtime();
    let settings = ControllerSettings {
        install_command: "echo 'No matching distribution'; exit 3".to_string(),
        ..test_settings("nonexistent_binary_123")
    };
    let mut ctrl = controller(&rt, settings);

    ctrl.install();
    tick_until(&mut ctrl, Duration::from_secs(5), |c| !c.is_installing());
    assert!(log_contains(&ctrl, "Installation failed with return code 3"));
    assert!(!ctrl.command_status().is_found());
}

#[test]
fn test_command_edit_is_debounced() {
    let rt = runtime();
    let mut ctrl = controller(&rt, test_settings("nonexistent_binary_123"));
    assert!(!ctrl.command_status().is_found());

    ctrl.set_command("sh".to_string());
    // Not re-checked yet
    assert!(!ctrl.command_status().is_found());

    tick_until(&mut ctrl, Duration::from_secs(3), |c| c.command_status().is_found());
}

#[test]
fn test_browse_selection_rechecks_immediately() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "picked", "exit 0");
    let mut ctrl = controller(&rt, test_settings("nonexistent_binary_123"));

    ctrl.set_command_from_path(&script);
    assert_eq!(ctrl.command_text(), script.to_str().unwrap());
    assert!(ctrl.command_status().is_found());
}

#[test]
fn test_shutdown_stops_running_service() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-webui", "exec sleep 30");
    let mut ctrl = controller(&rt, test_settings(script.to_str().unwrap()));

    ctrl.start_service();
    assert!(ctrl.is_running());

    ctrl.shutdown();
    assert!(!ctrl.manager().is_busy());
    assert!(ctrl.timers().all_cancelled());
    assert!(log_contains(&ctrl, "OpenWebUI service stopped"));
    assert_eq!(ctrl.tick(Instant::now()), None);
}

#[test]
fn test_log_view_is_capped() {
    let rt = runtime();
    let settings = ControllerSettings {
        max_log_lines: 10,
        ..test_settings("sh")
    };
    let mut ctrl = controller(&rt, settings);
    for i in 0..50 {
        ctrl.append_log(format!("message {}", i));
    }
    assert_eq!(ctrl.log_lines().len(), 10);
    assert!(ctrl.log_lines().back().unwrap().ends_with("message 49"));
}

#[test]
fn test_stop_failure_still_resets_with_error_status() {
    use webui_controller::models::{RelayEvent, StopOutcome};

    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-webui", "exec sleep 30");
    let mut ctrl = controller(&rt, test_settings(script.to_str().unwrap()));

    ctrl.start_service();
    ctrl.stop_service();
    // First start of a fresh controller is generation 1; this notice beats
    // the real one, which then arrives stale
    ctrl.output_sender()
        .send(RelayEvent::Stopped {
            generation: 1,
            outcome: StopOutcome::Failed("Operation not permitted".to_string()),
        })
        .unwrap();

    tick_until(&mut ctrl, Duration::from_secs(2), |c| c.status() == ServiceStatus::Error);
    assert!(log_contains(&ctrl, "Error stopping service: Operation not permitted"));
    assert!(ctrl.can_start());
    assert!(!ctrl.can_stop());

    // The real shutdown still completes in the background; give it time
    std::thread::sleep(Duration::from_millis(700));
    ctrl.tick(Instant::now());
    assert_eq!(ctrl.status(), ServiceStatus::Error);

    ctrl.start_service();
    assert_eq!(ctrl.status(), ServiceStatus::Running);
    ctrl.shutdown();
}

#[test]
fn test_install_allowed_while_service_runs() {
    let rt = runtime();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "fake-webui", "exec sleep 30");
    let settings = ControllerSettings {
        install_command: "echo Requirement already satisfied".to_string(),
        ..test_settings(script.to_str().unwrap())
    };
    let mut ctrl = controller(&rt, settings);

    ctrl.start_service();
    assert!(ctrl.can_install());
    ctrl.install();
    assert!(ctrl.is_installing());
    // A second click while the first install runs is ignored
    assert!(!ctrl.can_install());

    tick_until(&mut ctrl, Duration::from_secs(5), |c| !c.is_installing());
    assert!(log_contains(&ctrl, "Requirement already satisfied"));
    assert!(log_contains(&ctrl, "OpenWebUI installed successfully"));
    assert!(ctrl.is_running());
    ctrl.shutdown();
}
