//! Logging configuration and setup.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::RustKitError;

/// Crates whose targets the interaction presets enable.
const INTERACTION_TARGETS: &[&str] = &["rustkit_dom", "rustkit_interactions"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Include source file location.
    pub include_location: bool,
    /// Include span events (enter, exit).
    pub include_span_events: bool,
    /// Write to the test writer so output is captured per test.
    pub test_writer: bool,
    /// Custom filter string (e.g., "rustkit_interactions=trace").
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            include_location: false,
            include_span_events: false,
            test_writer: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Create a debug configuration.
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            include_location: true,
            ..Default::default()
        }
    }

    /// Create a configuration that traces every gesture transition of the
    /// interaction crates and keeps everything else at `warn`.
    pub fn gestures() -> Self {
        let directives = INTERACTION_TARGETS
            .iter()
            .map(|target| format!("{target}=trace"))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            level: Level::TRACE,
            format: LogFormat::Compact,
            ..Default::default()
        }
        .with_filter(format!("warn,{directives}"))
    }

    /// Create a configuration suited to `cargo test` output capture.
    pub fn for_tests() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Compact,
            test_writer: true,
            ..Default::default()
        }
    }

    /// Create a production configuration.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Set a custom filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(ref custom_filter) = self.filter {
            EnvFilter::try_new(custom_filter)
                .unwrap_or_else(|_| EnvFilter::new(format!("{}", self.level)))
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}", self.level)))
        }
    }
}

/// Initialize logging with the given configuration.
///
/// Panics if a global subscriber is already installed; use
/// [`try_init_logging`] where that can happen (tests, embedders).
pub fn init_logging(config: LogConfig) {
    if let Err(err) = try_init_logging(config) {
        panic!("{err}");
    }
}

/// Initialize logging, reporting an already-installed subscriber as an error.
pub fn try_init_logging(config: LogConfig) -> Result<(), RustKitError> {
    let filter = config.env_filter();

    let span_events = if config.include_span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match (config.format, config.test_writer) {
        (LogFormat::Pretty, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events),
            )
            .try_init(),
        (LogFormat::Pretty, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_span_events(span_events),
            )
            .try_init(),
        (LogFormat::Compact, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_span_events(span_events),
            )
            .try_init(),
        (LogFormat::Compact, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_test_writer()
                    .with_span_events(span_events),
            )
            .try_init(),
        (LogFormat::Json, _) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_span_events(span_events))
            .try_init(),
    };

    result.map_err(|e| RustKitError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.include_location);
        assert!(!config.test_writer);
    }

    #[test]
    fn test_log_config_gestures_filter() {
        let config = LogConfig::gestures();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(
            config.filter.as_deref(),
            Some("warn,rustkit_dom=trace,rustkit_interactions=trace")
        );
    }

    #[test]
    fn test_second_init_is_reported() {
        let _ = try_init_logging(LogConfig::for_tests());
        let second = try_init_logging(LogConfig::for_tests());
        assert!(matches!(second, Err(RustKitError::Logging(_))));
    }
}
