//! Logging bootstrap.
//!
//! Every module logs through the `log` facade. The binary installs a
//! `flexi_logger` backend once per process:
//!
//! - batch commands log to stderr
//! - the TUI logs to a rotating file under `--log-dir`, or not at all when no
//!   directory is given (stderr output would corrupt the alternate screen)
//!
//! `RUST_LOG` overrides the requested level when set.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;

use crate::error::AppError;

const LOG_FILE_BASENAME: &str = "vkx";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
    Disabled,
}

impl LogTarget {
    /// Pick the target for a command: TUI sessions never write to stderr.
    pub fn for_command(interactive: bool, log_dir: Option<&Path>) -> Self {
        match (log_dir, interactive) {
            (Some(dir), _) => LogTarget::Directory(dir.to_path_buf()),
            (None, true) => LogTarget::Disabled,
            (None, false) => LogTarget::Stderr,
        }
    }
}

/// Initialize logging. Repeated calls are no-ops.
pub fn init_logging(level: &str, target: &LogTarget) -> Result<(), AppError> {
    if LOGGER.get().is_some() || *target == LogTarget::Disabled {
        return Ok(());
    }

    let level = normalize_level(level)?;
    let logger = Logger::try_with_env_or_str(level)
        .map_err(|e| AppError::input(format!("Invalid log specification '{level}': {e}")))?;

    let handle = match target {
        LogTarget::Stderr => logger.log_to_stderr().start(),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::input(format!("Failed to create log directory '{}': {e}", dir.display()))
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME)
                        .suppress_timestamp(),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .start()
        }
        LogTarget::Disabled => return Ok(()),
    }
    .map_err(|e| AppError::internal(format!("Failed to start logger: {e}")))?;

    let _ = LOGGER.set(handle);
    info!("logging initialized at level {level}");
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, AppError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Ok("error"),
        "warn" | "warning" => Ok("warn"),
        "info" => Ok("info"),
        "debug" => Ok("debug"),
        "trace" => Ok("trace"),
        "off" => Ok("off"),
        other => Err(AppError::input(format!(
            "Unsupported log level '{other}'. Use one of: error, warn, info, debug, trace, off."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_normalized() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert_eq!(normalize_level("debug").unwrap(), "debug");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn tui_without_directory_disables_logging() {
        assert_eq!(LogTarget::for_command(true, None), LogTarget::Disabled);
        assert_eq!(LogTarget::for_command(false, None), LogTarget::Stderr);
        assert_eq!(
            LogTarget::for_command(true, Some(Path::new("logs"))),
            LogTarget::Directory(PathBuf::from("logs"))
        );
    }

    #[test]
    fn disabled_target_is_a_no_op() {
        assert!(init_logging("info", &LogTarget::Disabled).is_ok());
    }
}
