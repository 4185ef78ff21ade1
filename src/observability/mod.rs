//! Logging and metrics.

mod logging;
pub mod metrics;

pub use logging::{LOG_ENV, LOG_FILE_ENV, LOG_FORMAT_ENV, LogFormat, LoggingConfig};

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Initializes logging from the environment.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log file
/// cannot be opened.
pub fn init_from_env(verbose: bool) -> Result<()> {
    init(LoggingConfig::from_env(verbose))
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log file
/// cannot be opened.
pub fn init(config: LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "logging_init".to_string(),
            cause: "logging already initialized".to_string(),
        });
    }

    let file = config.file.as_deref().map(open_log_file).transpose()?;
    tracing_subscriber::registry()
        .with(fmt_layer(config.format, file))
        .with(config.filter)
        .try_init()
        .map_err(|e| Error::failed("logging_init", e))?;

    LOGGING_INIT.set(()).map_err(|()| Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: "failed to mark logging initialized".to_string(),
    })?;
    metrics::describe();
    Ok(())
}

/// Formatting layer writing to `file`, or to stderr when none is given.
fn fmt_layer(format: LogFormat, file: Option<File>) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer().with_target(true);
    match (format, file) {
        (LogFormat::Json, Some(file)) => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(Mutex::new(file))
            .boxed(),
        (LogFormat::Json, None) => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .boxed(),
        (LogFormat::Pretty, Some(file)) => {
            layer.with_ansi(false).with_writer(Mutex::new(file)).boxed()
        },
        (LogFormat::Pretty, None) => layer.pretty().with_writer(io::stderr).boxed(),
    }
}

/// Opens a log file for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::failed("create_log_dir", e))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_events_reach_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("octopus.log");
        let file = open_log_file(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(fmt_layer(LogFormat::Json, Some(file)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(unit = 2, "Recorded samples");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "Recorded samples");
        assert_eq!(event["fields"]["unit"], 2);
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("octopus.log");
        std::fs::write(&path, "first\n").unwrap();
        let file = open_log_file(&path).unwrap();
        let subscriber =
            tracing_subscriber::registry().with(fmt_layer(LogFormat::Pretty, Some(file)));

        tracing::subscriber::with_default(subscriber, || tracing::warn!("second"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("first\n"));
        assert!(contents.contains("second"));
    }
}
