//! # RustKit Common
//!
//! Common error types and logging configuration shared by the RustKit DOM
//! model and the interaction engine.
//!
//! ## Features
//!
//! - Unified error type with per-layer categories
//! - Logging configuration and setup
//! - Result extension traits

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, try_init_logging, LogConfig, LogFormat};

/// Boxed source error carried by the layered variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for RustKit.
#[derive(Error, Debug)]
pub enum RustKitError {
    /// DOM-related errors (unknown nodes, detached targets, parse failures).
    #[error("DOM error: {message}")]
    Dom {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Interaction engine errors (attachment, classification).
    #[error("Interaction error: {message}")]
    Interaction {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration errors.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RustKitError {
    /// Create a DOM error.
    pub fn dom(message: impl Into<String>) -> Self {
        Self::Dom {
            message: message.into(),
            source: None,
        }
    }

    /// Create a DOM error with source.
    pub fn dom_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Dom {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an interaction error.
    pub fn interaction(message: impl Into<String>) -> Self {
        Self::Interaction {
            message: message.into(),
            source: None,
        }
    }

    /// Create an interaction error with source.
    pub fn interaction_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Interaction {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Get the error category for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            RustKitError::Dom { .. } => "dom",
            RustKitError::Interaction { .. } => "interaction",
            RustKitError::Config { .. } => "config",
            RustKitError::Logging(_) => "logging",
            RustKitError::NotFound(_) => "not_found",
            RustKitError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Result type alias for RustKit operations.
pub type Result<T> = std::result::Result<T, RustKitError>;

/// Extension trait for Result.
pub trait ResultExt<T> {
    /// Wrap the error as an interaction error with context.
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| RustKitError::interaction_with_source(message, e))
    }
}

/// Extension trait for Option.
pub trait OptionExt<T> {
    /// Convert None to a NotFound error.
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, resource: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| RustKitError::NotFound(resource.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(RustKitError::dom("test").category(), "dom");
        assert_eq!(RustKitError::interaction("test").category(), "interaction");
        assert_eq!(RustKitError::config("zero threshold").category(), "config");
        assert_eq!(RustKitError::Logging("x".into()).category(), "logging");
    }

    #[test]
    fn test_context_keeps_source() {
        let parsed: std::result::Result<u32, std::num::ParseIntError> = "x".parse();
        let err = parsed.context("reading pointer id").unwrap_err();
        assert_eq!(err.category(), "interaction");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "Interaction error: reading pointer id");
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_not_found("test").unwrap(), 42);

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_not_found("test"),
            Err(RustKitError::NotFound(_))
        ));
    }
}
