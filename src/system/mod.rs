/// System module: command resolution, shell invocation and logging helpers

pub mod command;

pub use command::{
    check_command, find_in_path, is_executable_file, resolve_command, service_command_line,
    shell_command, CommandStatus,
};

/// Logging macros for convenient access
/// Thin wrappers over the log crate with a component tag
#[macro_export]
macro_rules! log_info {
    ($tag:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::info!("[{}] {}", $tag, msg);
    }}
}

#[macro_export]
macro_rules! log_warn {
    ($tag:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::warn!("[{}] {}", $tag, msg);
    }}
}
