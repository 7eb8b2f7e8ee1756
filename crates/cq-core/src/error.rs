//! Error types for cq-core

use thiserror::Error;

/// Core error type shared by every compilation phase
#[derive(Error, Debug)]
pub enum XrError {
    /// XR001: A tree has a shape the current phase cannot handle
    #[error("[XR001] Unexpected tree shape: {message}\n  in: {subtree}")]
    ParseShape { message: String, subtree: String },

    /// XR002: A structural precondition of a rewrite does not hold
    #[error("[XR002] Structural error: {message}\n  in: {subtree}")]
    Structural { message: String, subtree: String },

    /// XR003: Light type information is inconsistent
    #[error("[XR003] Type error: {message}\n  in: {subtree}")]
    Typing { message: String, subtree: String },

    /// XR004: Configuration file not found
    #[error("[XR004] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// XR005: Failed to parse configuration YAML
    #[error("[XR005] Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// XR006: Invalid configuration value
    #[error("[XR006] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// XR007: IO error with file path context
    #[error("[XR007] IO error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl XrError {
    /// Build a [`XrError::ParseShape`] from anything printable
    pub fn parse_shape(message: impl Into<String>, subtree: &impl std::fmt::Display) -> Self {
        XrError::ParseShape {
            message: message.into(),
            subtree: subtree.to_string(),
        }
    }

    /// Build a [`XrError::Structural`] from anything printable
    pub fn structural(message: impl Into<String>, subtree: &impl std::fmt::Display) -> Self {
        XrError::Structural {
            message: message.into(),
            subtree: subtree.to_string(),
        }
    }

    /// Build a [`XrError::Typing`] from anything printable
    pub fn typing(message: impl Into<String>, subtree: &impl std::fmt::Display) -> Self {
        XrError::Typing {
            message: message.into(),
            subtree: subtree.to_string(),
        }
    }
}

/// Result type alias for XrError
pub type XrResult<T> = Result<T, XrError>;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
