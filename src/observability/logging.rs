//! Logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "OCTOPUS_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "OCTOPUS_LOG_FORMAT";

/// Environment variable naming a log file.
pub const LOG_FILE_ENV: &str = "OCTOPUS_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name (case-insensitive). Unknown names select pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append events to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Default filter directive.
    pub const DEFAULT_FILTER: &'static str = "warn";

    /// Filter directive used with `--verbose`.
    pub const VERBOSE_FILTER: &'static str = "debug";

    /// Builds the configuration from `OCTOPUS_LOG` (falling back to
    /// `RUST_LOG`), `OCTOPUS_LOG_FORMAT` and `OCTOPUS_LOG_FILE`.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let directive = std::env::var(LOG_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        let format = std::env::var(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();
        let file = std::env::var(LOG_FILE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self::new(directive.as_deref(), verbose, format, file)
    }

    /// Builds the configuration from explicit values.
    ///
    /// `--verbose` only applies when no directive is given. An invalid
    /// directive falls back to the default filter.
    #[must_use]
    pub fn new(
        directive: Option<&str>,
        verbose: bool,
        format: LogFormat,
        file: Option<PathBuf>,
    ) -> Self {
        let fallback = if verbose {
            Self::VERBOSE_FILTER
        } else {
            Self::DEFAULT_FILTER
        };
        let filter = directive
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new(fallback));

        Self {
            filter,
            format,
            file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_verbose_fallback() {
        let config = LoggingConfig::new(None, true, LogFormat::Pretty, None);
        assert_eq!(config.filter.to_string(), "debug");
        let config = LoggingConfig::new(None, false, LogFormat::Json, None);
        assert_eq!(config.filter.to_string(), "warn");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_directive_wins() {
        let config = LoggingConfig::new(Some("octopus=trace"), true, LogFormat::Pretty, None);
        assert_eq!(config.filter.to_string(), "octopus=trace");
    }
}
