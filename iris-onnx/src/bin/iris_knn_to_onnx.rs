//! Fit a K=3 classifier on the full Iris dataset and export it as ONNX.
//!
//! Usage:
//!   iris-knn-to-onnx
//!   iris-knn-to-onnx --output model.onnx --zipmap --verify

use anyhow::Result;
use clap::Parser;
use iris_ml::{logging, ONNX_MODEL_FILE};
use iris_onnx::{export_iris_knn, ConvertOptions};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "iris-knn-to-onnx")]
#[command(about = "Export the Iris KNN classifier to ONNX")]
#[command(version)]
struct Cli {
    /// Output file
    #[arg(long, default_value = ONNX_MODEL_FILE)]
    output: PathBuf,

    /// Emit `output_label`/`output_probability` through a ZipMap node
    #[arg(long)]
    zipmap: bool,

    /// Reload the file in ONNX Runtime and check it against the classifier
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let report = export_iris_knn(
        &cli.output,
        ConvertOptions { zipmap: cli.zipmap },
        cli.verify,
    )?;
    debug!(?report, "export finished");

    println!("Model saved.");
    Ok(())
}
