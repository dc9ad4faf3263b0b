//! Application-wide error types.
//!
//! This module defines the top-level error type for the crate, wrapping the
//! per-module error types so callers can use one `Result` alias.

pub use crate::api::ClassifiedFailure;
pub use crate::config::ConfigError;

/// Main application error type.
///
/// Encompasses every error type in the crate. It uses `thiserror` for
/// automatic error derivation and conversion.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Board service request errors
    #[error("Request failed: {0}")]
    Request(#[from] ClassifiedFailure),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logger initialization errors
    #[error("Logger error: {0}")]
    Logger(String),
}

/// Convenience type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
