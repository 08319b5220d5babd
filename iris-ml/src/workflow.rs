//! Train-or-predict workflow
//!
//! ```text
//!   load_and_prepare_data
//!          │
//!    train? ├── yes ──► train_and_save_model ──► iris_knn_model.pkl
//!          │
//!          └── no ───► load_and_predict_model ◄── iris_knn_model.pkl
//! ```
//!
//! Exactly one branch runs per invocation. Two concurrent training runs race
//! on the model file: the last writer wins and a concurrent reader may see a
//! partially written file.

use crate::core::config::TrainingConfig;
use crate::core::unified_error::{errors, UnifiedResult};
use crate::dataset::{load_iris, IrisDataset};
use crate::knn::{KnnClassifier, KnnParams};
use crate::split::train_test_split;
use linfa::prelude::*;
use ndarray::{Array2, ArrayView2};
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Fraction of correctly classified test samples, in `[0, 1]`
    pub accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub model_path: PathBuf,
}

/// One classified input row
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Trained(TrainingReport),
    Predicted(Vec<Prediction>),
}

/// Load the Iris dataset with its class names
pub fn load_and_prepare_data() -> UnifiedResult<IrisDataset> {
    load_iris()
}

/// Split, fit, evaluate on the held-out part and persist the fitted model
pub fn train_and_save_model(
    dataset: &IrisDataset,
    config: &TrainingConfig,
) -> UnifiedResult<TrainingReport> {
    config.validate()?;

    let split = train_test_split(
        &dataset.records,
        &dataset.targets,
        config.test_size,
        config.random_state,
    )?;
    info!(
        train = split.train_indices.len(),
        test = split.test_indices.len(),
        seed = config.random_state,
        "split dataset"
    );

    let model = KnnParams::new(config.n_neighbors).fit(&split.train)?;

    let predicted = model.predict(split.test.records().view())?;
    let accuracy = predicted.confusion_matrix(&split.test)?.accuracy() as f64;
    println!("Model accuracy: {accuracy:.2}");

    model.save(&config.model_path)?;
    println!("Model trained and saved.");

    Ok(TrainingReport {
        accuracy,
        n_train: split.train_indices.len(),
        n_test: split.test_indices.len(),
        model_path: config.model_path.clone(),
    })
}

/// Load the persisted model and classify each row of `new_data`
///
/// Fails with `FileNotFound` when no model has been trained yet.
pub fn load_and_predict_model(
    model_path: &Path,
    target_names: &[String],
    new_data: ArrayView2<f64>,
) -> UnifiedResult<Vec<Prediction>> {
    let model = KnnClassifier::load(model_path)?;
    println!("Model loaded.");

    let class_ids = model.predict(new_data)?;
    let predictions = class_ids
        .iter()
        .map(|&class_id| {
            let class_name = target_names.get(class_id).cloned().ok_or_else(|| {
                errors::validation(
                    "class_id",
                    format!("index below {}", target_names.len()),
                    class_id,
                )
            })?;
            Ok(Prediction {
                class_id,
                class_name,
            })
        })
        .collect::<UnifiedResult<Vec<_>>>()?;

    if let Some(first) = predictions.first() {
        println!("Prediction: {}", first.class_name);
    }
    Ok(predictions)
}

/// Run one branch of the workflow
pub fn run(train: bool, config: &TrainingConfig, new_data: &Array2<f64>) -> UnifiedResult<Outcome> {
    let dataset = load_and_prepare_data()?;

    if train {
        train_and_save_model(&dataset, config).map(Outcome::Trained)
    } else {
        load_and_predict_model(&config.model_path, &dataset.target_names, new_data.view())
            .map(Outcome::Predicted)
    }
}
