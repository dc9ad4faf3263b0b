//! Errors raised while reading or writing `config.yml`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file path not set")]
    FilePathNotSet,

    #[error("Failed to find home directory")]
    HomeDirectoryNotFound,

    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Session or settings could not be written back.
    #[error("Failed to save configuration to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create configuration directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize configuration: {0}")]
    DeserializationFailed(String),

    /// `base_url` must be an absolute http(s) URL.
    #[error("Invalid base_url '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// A stored user whose token is gone. Not fatal; the user is dropped.
    #[error("Stored user '{0}' has no access token; ignoring the stale session")]
    OrphanedUser(String),
}
