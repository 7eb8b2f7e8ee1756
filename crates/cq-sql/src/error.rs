//! Error types for cq-sql

use thiserror::Error;

/// SQL generation errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// S001: Core error propagation
    #[error("[S001] {0}")]
    Xr(#[from] cq_core::XrError),

    /// S002: Normalization failed
    #[error("[S002] {0}")]
    Normalize(#[from] cq_normalize::NormalizeError),

    /// S003: A shape that normalization should have removed reached flattening
    #[error("[S003] Query not properly normalized: {subtree}")]
    NotNormalized { subtree: String },

    /// S004: Generated SQL does not parse for the target dialect
    #[error("[S004] Generated SQL is invalid at line {line}, column {column}: {message}\n  sql: {sql}")]
    InvalidSql {
        message: String,
        line: usize,
        column: usize,
        sql: String,
    },
}

impl SqlError {
    /// Build a [`SqlError::NotNormalized`] from anything printable
    pub fn not_normalized(subtree: &impl std::fmt::Display) -> Self {
        SqlError::NotNormalized {
            subtree: subtree.to_string(),
        }
    }
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
