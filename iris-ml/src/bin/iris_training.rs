//! Train the Iris KNN model or classify a sample with a previously trained one.
//!
//! Usage:
//!   iris-training --train
//!   iris-training --data 6.3,3.3,6.0,2.5

use anyhow::{Context, Result};
use clap::Parser;
use iris_ml::dataset::parse_feature_list;
use iris_ml::workflow::{self, Outcome};
use iris_ml::{logging, TrainingConfig, DEFAULT_SAMPLE};
use ndarray::Array2;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "iris-training")]
#[command(about = "Iris dataset model training and inference")]
#[command(version)]
struct Cli {
    /// Train and save the model instead of predicting
    #[arg(long)]
    train: bool,

    /// Model file (defaults to iris_knn_model.pkl)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Sample to classify, as 4 comma-separated numbers
    #[arg(long)]
    data: Option<String>,

    /// JSON file overriding the training configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TrainingConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(model) = cli.model {
        config = config.with_model_path(model);
    }
    debug!(?config, train = cli.train, "starting");

    let sample = match &cli.data {
        Some(text) => parse_feature_list(text, DEFAULT_SAMPLE.len())?,
        None => DEFAULT_SAMPLE.to_vec(),
    };
    let new_data = Array2::from_shape_vec((1, sample.len()), sample)?;

    match workflow::run(cli.train, &config, &new_data)? {
        Outcome::Trained(report) => debug!(?report, "training finished"),
        Outcome::Predicted(predictions) => debug!(?predictions, "prediction finished"),
    }
    Ok(())
}
