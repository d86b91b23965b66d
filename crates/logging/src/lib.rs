//! Logging initialization for the luascope binaries.
//!
//! Three modes are supported:
//! - CLI mode: human readable logs on STDERR, so STDOUT stays free for JSON
//!   query results.
//! - DataStdout mode: no subscriber at all, for callers that parse STDOUT and
//!   do not want any interleaved diagnostics.
//! - File mode: logs to a rolling file, either at a given path or under the
//!   user's local data directory.
//!
//! File logs are rolled over when they reach 5 MB. Rotated logs are
//! compressed. The maximum number of rotated logs is 20.

use anyhow::{Result, anyhow};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

const LOG_DIR_NAME: &str = "luascope";
const LOG_FILE_NAME: &str = "luascope.log";
const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;
const MAX_ROTATED_LOGS: usize = 20;

pub enum LogMode {
    Cli,
    DataStdout,
    /// Rolling file; `None` picks the default location.
    File(Option<PathBuf>),
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;
            Ok(None)
        }
        LogMode::DataStdout => Ok(None),
        LogMode::File(path) => {
            let log_path = match path {
                Some(path) => path,
                None => default_log_path()?,
            };
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let writer = rotating_writer(&log_path);
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking.with_max_level(tracing::Level::DEBUG))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

            Ok(Some(LoggingGuards {
                _guards: vec![guard],
            }))
        }
    }
}

/// `<local data dir>/luascope/logs/luascope.log`
pub fn default_log_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("Could not find local data directory"))?;
    Ok(data_dir.join(LOG_DIR_NAME).join("logs").join(LOG_FILE_NAME))
}

fn rotating_writer(log_path: &Path) -> FileRotate<AppendCount> {
    FileRotate::new(
        log_path,
        AppendCount::new(MAX_ROTATED_LOGS),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::OnRotate(1),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_log_path_ends_with_log_file() {
        if let Ok(path) = default_log_path() {
            assert!(path.ends_with("luascope/logs/luascope.log"));
        }
    }

    #[test]
    fn test_rotating_writer_creates_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let mut writer = rotating_writer(&log_path);
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "hello\n");
    }

    #[test]
    fn test_data_stdout_installs_nothing() {
        assert!(init(LogMode::DataStdout, true).unwrap().is_none());
    }
}
