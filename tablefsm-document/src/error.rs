//! Document error types.

use thiserror::Error;

/// Errors from parsing or decoding a transition document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unexpected root tag '{found}'")]
    UnexpectedRoot { found: String },

    #[error("unknown tag '{tag}' inside '{parent}'")]
    UnknownTag { tag: String, parent: String },

    #[error("missing {field} in '{tag}'")]
    MissingValue { tag: String, field: &'static str },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DocumentError {
    /// Returns an error code suitable for tooling output.
    pub fn error_code(&self) -> &'static str {
        match self {
            DocumentError::UnexpectedRoot { .. } => "UNEXPECTED_ROOT",
            DocumentError::UnknownTag { .. } => "UNKNOWN_TAG",
            DocumentError::MissingValue { .. } => "MISSING_VALUE",
            DocumentError::Json(_) | DocumentError::Yaml(_) => "BAD_SYNTAX",
        }
    }
}
