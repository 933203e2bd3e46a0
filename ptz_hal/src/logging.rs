//! Log sink setup.
//!
//! Console output goes to stderr (plain text or JSON) so that stdout stays
//! reserved for query results. When `debug_log` is set, the same records are
//! also appended, one timestamped line each, to the configured log file.

use ptz_common::hal::config::PtzConfig;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{Level, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Console options chosen on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Force debug verbosity.
    pub verbose: bool,
    /// JSON console output.
    pub json: bool,
}

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("tracing already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// A log file that cannot be opened only disables the file sink.
pub fn init(config: &PtzConfig, options: LogOptions) -> Result<(), LoggingError> {
    let level = if options.verbose {
        Level::DEBUG
    } else {
        config.log_level.into()
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let console = if options.json {
        fmt::layer().json().with_writer(io::stderr).boxed()
    } else {
        fmt::layer().with_writer(io::stderr).boxed()
    };

    let (file, file_error) = if config.debug_log {
        match open_log_file(&config.log_file) {
            Ok(file) => (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file))
                        .boxed(),
                ),
                None,
            ),
            Err(e) => (None, Some((config.log_file.clone(), e))),
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    if let Some((path, e)) = file_error {
        warn!("log file {} disabled: {}", path.display(), e);
    }
    Ok(())
}

/// Open `path` for appending, creating parent directories as needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_with_parents_and_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("ptz.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn log_file_under_unwritable_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        assert!(open_log_file(&blocker.join("ptz.log")).is_err());
    }
}
