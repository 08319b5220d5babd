//! Unified error types for the ONNX export and runtime library

use iris_ml::UnifiedError;

/// Unified error type for the library
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Failure in the underlying classifier or dataset
    #[error(transparent)]
    Ml(#[from] UnifiedError),

    /// Model or input declaration the converter cannot express
    #[error("Cannot convert {model}: {message}")]
    Conversion { model: String, message: String },

    /// ONNX Runtime error
    #[error("ONNX Runtime error during '{operation}': {reason}")]
    Ort { operation: String, reason: String },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bytes on disk are not an ONNX model
    #[error("Invalid ONNX model in '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// Session output did not have the expected name, type or shape
    #[error("Inference error during '{operation}': {message}")]
    Inference { operation: String, message: String },

    /// Exported graph disagrees with the in-process classifier
    #[error("Exported graph disagrees with the classifier on {mismatches} of {total} samples (first at row {first_row}: expected {expected}, got {actual})")]
    VerificationFailed {
        mismatches: usize,
        total: usize,
        first_row: usize,
        expected: usize,
        actual: i64,
    },
}

/// Result type alias using ExportError
pub type ExportResult<T> = Result<T, ExportError>;

/// Helper functions for creating errors
pub mod errors {
    use super::ExportError;
    use std::path::Path;

    pub fn conversion(model: &str, message: &str) -> ExportError {
        ExportError::Conversion {
            model: model.to_string(),
            message: message.to_string(),
        }
    }

    pub fn ort_error(operation: &str, reason: &str) -> ExportError {
        ExportError::Ort {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn file_not_found(path: impl AsRef<Path>) -> ExportError {
        ExportError::FileNotFound {
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> ExportError {
        if source.kind() == std::io::ErrorKind::NotFound {
            return file_not_found(path);
        }
        ExportError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn decode(path: impl AsRef<Path>, reason: &str) -> ExportError {
        ExportError::Decode {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn inference_error(operation: &str, message: &str) -> ExportError {
        ExportError::Inference {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}
