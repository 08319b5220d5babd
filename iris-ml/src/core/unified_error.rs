//! Unified error types for the Iris ML library

use std::path::Path;

/// Unified error type for the library
#[derive(Debug, thiserror::Error)]
pub enum UnifiedError {
    /// Persisted model or dataset file is missing
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Model file exists but could not be turned into a classifier
    #[error("Failed to load model from '{model_path}': {reason}")]
    ModelLoad { model_path: String, reason: String },

    /// Invalid JSON
    #[error("Invalid JSON in '{path}': {reason}")]
    InvalidJson { path: String, reason: String },

    /// Bundled dataset does not match its own header
    #[error("Invalid dataset at row {row}: {message}")]
    InvalidDataset { row: usize, message: String },

    /// Configuration error
    #[error("Configuration error for '{field}': {message}")]
    Config { field: String, message: String },

    /// Validation error
    #[error("Validation error for '{field}': expected {expected}, got {actual}")]
    Validation {
        field: String,
        expected: String,
        actual: String,
    },

    /// Classifier used before it was fitted
    #[error("Model not trained")]
    NotTrained,

    /// Nearest-neighbour search failed
    #[error("Inference error during '{operation}': {reason}")]
    Inference { operation: String, reason: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Linfa(#[from] linfa::Error),
}

/// Result type alias using UnifiedError
pub type UnifiedResult<T> = Result<T, UnifiedError>;

/// Helper functions for creating errors
pub mod errors {
    use super::*;

    pub fn file_not_found(path: impl AsRef<Path>) -> UnifiedError {
        UnifiedError::FileNotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn model_load(model_path: impl AsRef<Path>, reason: &str) -> UnifiedError {
        UnifiedError::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_json(path: impl AsRef<Path>, reason: &str) -> UnifiedError {
        UnifiedError::InvalidJson {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_dataset(row: usize, message: &str) -> UnifiedError {
        UnifiedError::InvalidDataset {
            row,
            message: message.to_string(),
        }
    }

    pub fn config_error(field: &str, message: &str) -> UnifiedError {
        UnifiedError::Config {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn validation(field: &str, expected: impl ToString, actual: impl ToString) -> UnifiedError {
        UnifiedError::Validation {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn inference_error(operation: &str, reason: &str) -> UnifiedError {
        UnifiedError::Inference {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map an I/O failure on `path`, turning `NotFound` into [`UnifiedError::FileNotFound`].
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> UnifiedError {
        if source.kind() == std::io::ErrorKind::NotFound {
            return file_not_found(path);
        }
        UnifiedError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err = errors::io(
            "missing.pkl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, UnifiedError::FileNotFound { ref path } if path == "missing.pkl"));
    }

    #[test]
    fn test_io_other_kind_is_kept() {
        let err = errors::io(
            "locked.pkl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, UnifiedError::Io { .. }));
        assert!(err.to_string().contains("locked.pkl"));
    }

    #[test]
    fn test_validation_message() {
        let err = errors::validation("new_data", "4 features", 3);
        assert_eq!(
            err.to_string(),
            "Validation error for 'new_data': expected 4 features, got 3"
        );
    }
}
