//! Serve Iris predictions from an exported ONNX model.
//!
//! Usage:
//!   iris-server --port 3000
//!   curl 'http://localhost:3000/iris?data=5.1,3.5,1.4,0.2'

use anyhow::Result;
use clap::Parser;
use iris_ml::{load_iris, logging, ONNX_MODEL_FILE};
use iris_onnx::{IrisServer, ServerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iris-server")]
#[command(about = "HTTP inference server for the exported Iris model")]
#[command(version)]
struct Cli {
    /// ONNX model to serve
    #[arg(long, default_value = ONNX_MODEL_FILE)]
    model: PathBuf,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let iris = load_iris()?;
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        model_path: cli.model,
    };
    let server = IrisServer::new(config, iris.target_names);
    server.start().await?;
    Ok(())
}
