//! Error types for the OSC catalog tools.
//!
//! Library crates use [`CatalogError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed CSV input (bad header, unreadable record, wrong field type).
    #[error("CSV error in {path:?}: {message}")]
    Csv { path: PathBuf, message: String },

    /// A single field value could not be parsed (date, geometry, ...).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A row references a theme or variable that does not exist.
    #[error("unresolved reference: {message}")]
    Reference { message: String },

    /// Output validation error (missing file, empty artifact, bad link).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON (de)serialization error for a catalog document.
    #[error("JSON error: {0}")]
    Json(String),

    /// An external command exited unsuccessfully or could not be spawned.
    #[error("command `{program}` failed: {status}")]
    CommandFailed { program: String, status: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a reference error from any displayable message.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a CSV error for a specific input file.
    pub fn csv(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Csv {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Record a failed external command.
    pub fn command_failed(program: impl Into<String>, status: impl Into<String>) -> Self {
        Self::CommandFailed {
            program: program.into(),
            status: status.into(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CatalogError::config("missing repository owner");
        assert_eq!(err.to_string(), "config error: missing repository owner");

        let err = CatalogError::reference("variable 'Sea Ice' has unknown theme 'Cryo'");
        assert!(err.to_string().starts_with("unresolved reference:"));
        assert!(err.to_string().contains("Sea Ice"));
    }

    #[test]
    fn command_failed_names_program() {
        let err = CatalogError::command_failed("npm", "exit status: 1");
        assert_eq!(err.to_string(), "command `npm` failed: exit status: 1");
    }

    #[test]
    fn csv_error_includes_path() {
        let err = CatalogError::csv("Themes.csv", "record 3: missing field `theme`");
        let msg = err.to_string();
        assert!(msg.contains("Themes.csv"));
        assert!(msg.contains("record 3"));
    }
}
