//! Training and inference configuration
//!
//! The defaults are plain constants; a JSON file can override any subset of
//! them through [`TrainingConfig::from_file`].

use crate::core::unified_error::{errors, UnifiedResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Constants
// ============================================================================

/// Persisted classifier written by training and read by prediction
pub const MODEL_FILE: &str = "iris_knn_model.pkl";
/// Exported ONNX graph
pub const ONNX_MODEL_FILE: &str = "iris_knn_model.onnx";
/// Neighbours consulted per vote
pub const N_NEIGHBORS: usize = 3;
/// Held-out fraction of the dataset
pub const TEST_SIZE: f64 = 0.2;
/// Seed for the train/test shuffle
pub const RANDOM_STATE: u64 = 42;
/// Sample classified when no input is supplied (a setosa)
pub const DEFAULT_SAMPLE: [f64; 4] = [5.1, 3.5, 1.4, 0.2];

// ============================================================================
// TrainingConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_path: PathBuf,
    pub n_neighbors: usize,
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(MODEL_FILE),
            n_neighbors: N_NEIGHBORS,
            test_size: TEST_SIZE,
            random_state: RANDOM_STATE,
        }
    }
}

impl TrainingConfig {
    /// Load a JSON config; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> UnifiedResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| errors::io(path, e))?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| errors::invalid_json(path, &e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> UnifiedResult<()> {
        if self.n_neighbors == 0 {
            return Err(errors::config_error("n_neighbors", "must be at least 1"));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(errors::config_error(
                "test_size",
                &format!("must be in (0, 1), got {}", self.test_size),
            ));
        }
        Ok(())
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_matches_constants() {
        let config = TrainingConfig::default();
        assert_eq!(config.model_path, PathBuf::from("iris_knn_model.pkl"));
        assert_eq!(config.n_neighbors, 3);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_neighbors": 5}}"#).unwrap();

        let config = TrainingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.n_neighbors, 5);
        assert_eq!(config.random_state, RANDOM_STATE);
    }

    #[test]
    fn test_rejects_zero_neighbors() {
        let config = TrainingConfig {
            n_neighbors: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_test_size() {
        let config = TrainingConfig {
            test_size: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
