//! Core error types for workpool operations.

use std::path::PathBuf;

use thiserror::Error;

/// The standard Result type for workpool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workpool operations.
#[derive(Debug, Error)]
pub enum Error {
    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    // Configuration errors
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Generic I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_file_read_error_with_path() {
        let err = Error::file_read_failed("/etc/workpool.toml", "permission denied");
        let msg = err.to_string();
        assert!(msg.contains("/etc/workpool.toml"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn should_render_invalid_config_with_field() {
        let err = Error::invalid_config("pool.rpc_timeout_ms", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: pool.rpc_timeout_ms: must be greater than 0"
        );
    }

    #[test]
    fn should_wrap_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
