//! Tracing setup for Watchflood
//!
//! Console logs at a user-controlled level plus a full trace log on disk, so a
//! long load run can be replayed from its seed and inspected afterwards
//! without drowning the terminal.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run trace log, overwritten on every run.
pub const LOG_FILE_NAME: &str = "watchflood-last-run.log";

/// Initialize tracing with dual output: console (user level) + file (full trace)
///
/// `RUST_LOG` takes precedence over `console_level` for the console layer.
/// Returns the path of the trace log file.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the logs directory cannot be created,
///   the log file cannot be opened, or a global subscriber is already set
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_file_path = prepare_log_file(logs_dir)?;
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Tracing initialized: console={}, trace_file={}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// Ensure the logs directory exists and return the trace log path inside it.
fn prepare_log_file(logs_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;
    Ok(logs_path.join(LOG_FILE_NAME))
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use watchflood_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Info.as_tracing_level();
    /// assert_eq!(level, tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_log_file_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("nested").join("logs");

        let path = prepare_log_file(Some(&nested)).unwrap();

        assert!(nested.is_dir());
        assert_eq!(path, nested.join(LOG_FILE_NAME));
    }

    #[test]
    fn test_cli_log_level_mapping() {
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
        assert_eq!(CliLogLevel::Warn.to_string(), "warn");
    }
}
