/// Command resolution and shell invocation
///
/// A command string is valid when it names an executable file directly or a
/// program discoverable on `PATH`. Validity is recomputed every time it is
/// needed and never cached.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Availability of the configured command, as shown under the command field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Not checked yet
    Unknown,
    /// Resolved to an executable at this path
    Found(PathBuf),
    NotFound,
}

impl CommandStatus {
    pub fn is_found(&self) -> bool {
        matches!(self, CommandStatus::Found(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CommandStatus::Unknown => "Checking command...",
            CommandStatus::Found(_) => "✓ Command found",
            CommandStatus::NotFound => "✗ Command not found",
        }
    }
}

/// Check the command and report its status
pub fn check_command(command: &str) -> CommandStatus {
    match resolve_command(command) {
        Some(path) => CommandStatus::Found(path),
        None => CommandStatus::NotFound,
    }
}

/// Resolve a command string to an executable path.
///
/// Accepts a path to an executable file, or a bare program name that can be
/// found on `PATH`. Returns `None` for empty input.
pub fn resolve_command(command: &str) -> Option<PathBuf> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    let as_path = Path::new(command);
    if is_executable_file(as_path) {
        return Some(as_path.to_path_buf());
    }

    // Names with a separator are paths, never PATH lookups
    if as_path.components().count() > 1 {
        return None;
    }

    find_in_path(command, std::env::var_os("PATH").as_deref())
}

/// Search a PATH-style list of directories for an executable named `name`
pub fn find_in_path(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    for dir in std::env::split_paths(path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidate_names(name) {
            let full = dir.join(&candidate);
            if is_executable_file(&full) {
                return Some(full);
            }
        }
    }
    None
}

#[cfg(windows)]
fn candidate_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    if Path::new(name).extension().is_none() {
        let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
        names.extend(exts.split(';').filter(|e| !e.is_empty()).map(|ext| format!("{}{}", name, ext)));
    }
    names
}

#[cfg(not(windows))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

/// True if `path` is a regular file the current user may execute
#[cfg(unix)]
pub fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn is_executable_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Quote a single word for `sh -c`
#[cfg(unix)]
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(not(unix))]
pub fn shell_quote(word: &str) -> String {
    if word.contains(' ') {
        format!("\"{}\"", word)
    } else {
        word.to_string()
    }
}

/// Build the command line that launches the service: `<command> <argument>`.
///
/// On Unix the line is prefixed with `exec` so the shell is replaced by the
/// service and the spawned pid is the service's own pid. Standard error is
/// merged into standard output by the shell.
pub fn service_command_line(command: &str, argument: &str) -> String {
    let base = format!("{} {}", shell_quote(command.trim()), argument);
    if cfg!(unix) {
        format!("exec {} 2>&1", base)
    } else {
        format!("{} 2>&1", base)
    }
}

/// Build a command line for a free-form shell command with merged output.
///
/// On Unix the whole line is grouped so every part of a compound command
/// (`a; b`, trailing `# comment`) has its stderr merged.
pub fn merged_output_line(command_line: &str) -> String {
    if cfg!(unix) {
        format!("{{ {}\n}} 2>&1", command_line)
    } else {
        format!("{} 2>&1", command_line)
    }
}

/// Wrap a command line in the platform shell (`sh -c` / `cmd /C`)
pub fn shell_command(command_line: &str) -> tokio::process::Command {
    #[cfg(windows)]
    {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}
