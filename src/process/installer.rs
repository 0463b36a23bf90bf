//! Installation helper.
//!
//! Runs the install command (`pip install open-webui` by default) through the
//! platform shell on a background task, relays its merged output through the
//! output queue and reports completion with `RelayEvent::InstallFinished`.

use super::relay::relay_lines;
use crate::models::{InstallOutcome, RelayEvent};
use crate::system::command::{merged_output_line, shell_command};
use crossbeam_channel::Sender;
use std::process::Stdio;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Start the installer in the background
pub fn spawn_install(runtime: &Handle, command_line: &str, tx: Sender<RelayEvent>) -> JoinHandle<()> {
    let command_line = command_line.to_string();
    runtime.spawn(async move {
        crate::log_info!("Install", "Running '{}'", command_line);
        let outcome = run_install(&command_line, &tx).await;
        match &outcome {
            InstallOutcome::Exited(code) => {
                crate::log_info!("Install", "Installer exited with {:?}", code)
            }
            InstallOutcome::Failed(reason) => {
                crate::log_warn!("Install", "Installer could not run: {}", reason)
            }
        }
        let _ = tx.send(RelayEvent::InstallFinished(outcome));
    })
}

/// Run the install command to completion, forwarding its output
pub async fn run_install(command_line: &str, tx: &Sender<RelayEvent>) -> InstallOutcome {
    let mut cmd = shell_command(&merged_output_line(command_line));
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return InstallOutcome::Failed(e.to_string()),
    };

    // stderr is merged by the shell; the pipe only catches the shell's own noise
    let stderr_task = child.stderr.take().map(|stderr| {
        let tx = tx.clone();
        tokio::spawn(async move { relay_lines(stderr, &tx).await })
    });

    if let Some(stdout) = child.stdout.take() {
        relay_lines(stdout, tx).await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    match child.wait().await {
        Ok(status) => InstallOutcome::Exited(status.code()),
        Err(e) => InstallOutcome::Failed(e.to_string()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::relay::{drain, output_queue};

    #[tokio::test]
    async fn test_successful_install_streams_output() {
        let (tx, rx) = output_queue();
        let outcome = run_install("echo Collecting open-webui; echo Done >&2", &tx).await;
        assert!(outcome.succeeded());

        let lines: Vec<RelayEvent> = drain(&rx);
        assert!(lines.contains(&RelayEvent::Line("Collecting open-webui".to_string())));
        assert!(lines.contains(&RelayEvent::Line("Done".to_string())));
    }

    #[tokio::test]
    async fn test_compound_install_keeps_stderr_in_order() {
        let (tx, rx) = output_queue();
        let outcome = run_install(
            "echo first >&2; sleep 0.1; echo second; sleep 0.1; echo third >&2 # pip flags",
            &tx,
        )
        .await;
        assert!(outcome.succeeded());

        assert_eq!(
            drain(&rx),
            vec![
                RelayEvent::Line("first".to_string()),
                RelayEvent::Line("second".to_string()),
                RelayEvent::Line("third".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_install_reports_code() {
        let (tx, _rx) = output_queue();
        let outcome = run_install("exit 2", &tx).await;
        assert_eq!(outcome, InstallOutcome::Exited(Some(2)));
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_spawned_install_sends_finished_last() {
        let (tx, rx) = output_queue();
        spawn_install(&Handle::current(), "echo step1; echo step2", tx)
            .await
            .unwrap();

        let events = drain(&rx);
        assert_eq!(
            events,
            vec![
                RelayEvent::Line("step1".to_string()),
                RelayEvent::Line("step2".to_string()),
                RelayEvent::InstallFinished(InstallOutcome::Exited(Some(0))),
            ]
        );
    }
}
