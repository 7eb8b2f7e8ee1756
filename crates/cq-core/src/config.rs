//! Compiler configuration
//!
//! Loaded from a small YAML file, every key is optional:
//!
//! ```yaml
//! dialect: postgres
//! max_normalize_iterations: 10000
//! trace_rewrites: false
//! default_alias: x
//! verify_sql: false
//! ```

use crate::error::{XrError, XrResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL
    #[default]
    Postgres,
    /// H2
    H2,
    /// SQLite
    Sqlite,
    /// MySQL
    MySql,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::H2 => write!(f, "h2"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::MySql => write!(f, "mysql"),
        }
    }
}

/// Settings shared by normalization and SQL generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileConfig {
    /// Dialect used for rendering
    #[serde(default)]
    pub dialect: Dialect,

    /// Upper bound on rewrite steps per normalization loop
    #[serde(default = "default_max_normalize_iterations")]
    pub max_normalize_iterations: usize,

    /// Log every rewrite step at trace level
    #[serde(default)]
    pub trace_rewrites: bool,

    /// Alias used for a query that has no binder of its own
    #[serde(default = "default_alias")]
    pub default_alias: String,

    /// Parse the generated SQL back before returning it
    #[serde(default)]
    pub verify_sql: bool,
}

fn default_max_normalize_iterations() -> usize {
    10_000
}

fn default_alias() -> String {
    "x".to_string()
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_normalize_iterations: default_max_normalize_iterations(),
            trace_rewrites: false,
            default_alias: default_alias(),
            verify_sql: false,
        }
    }
}

impl CompileConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> XrResult<Self> {
        if !path.exists() {
            return Err(XrError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        log::debug!("Loading compile config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| XrError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> XrResult<Self> {
        let config: CompileConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> XrResult<()> {
        if self.max_normalize_iterations == 0 {
            return Err(XrError::ConfigInvalid {
                message: "max_normalize_iterations must be at least 1".to_string(),
            });
        }

        let mut chars = self.default_alias.chars();
        let valid_alias = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_alias {
            return Err(XrError::ConfigInvalid {
                message: format!(
                    "default_alias '{}' is not a plain identifier",
                    self.default_alias
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
