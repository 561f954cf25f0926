//! Error types for relq.

use thiserror::Error;

/// The main error type for translation and postprocessing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A raw-SQL fragment references a parameter the values table does not hold.
    #[error("Missing parameter: '{0}' is not present in the parameter values")]
    MissingParameter(String),

    /// A parameter value has the wrong shape for where it is used.
    #[error("Invalid value for parameter '{name}': expected {expected}")]
    InvalidParameterValue {
        name: String,
        expected: &'static str,
    },

    /// A translator recognized a call but cannot translate its arguments.
    #[error("Cannot translate '{method}': {message}")]
    Translation { method: String, message: String },

    /// Failed to parse raw SQL format text.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a translation error for a recognized but malformed call.
    pub fn translation(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Translation {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for relq operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::parse(5, "unclosed placeholder");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unclosed placeholder"
        );
    }

    #[test]
    fn test_missing_parameter_display() {
        let err = QueryError::MissingParameter("p0".to_string());
        assert_eq!(
            err.to_string(),
            "Missing parameter: 'p0' is not present in the parameter values"
        );
    }

    #[test]
    fn test_translation_display() {
        let err = QueryError::translation("Math.Abs", "expected 1 argument, got 2");
        assert_eq!(err.to_string(), "Cannot translate 'Math.Abs': expected 1 argument, got 2");
    }
}
