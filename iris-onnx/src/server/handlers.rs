//! Request handlers for the inference server

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use iris_ml::dataset::parse_feature_list;
use iris_ml::DEFAULT_SAMPLE;
use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::unified_error::{errors, ExportResult};
use crate::runtime::{IrisOnnxModel, OnnxPrediction};

pub const INVALID_DATA_MESSAGE: &str =
    "Invalid data provided. Expected 4 numeric values separated by commas.";
pub const MODEL_NOT_READY_MESSAGE: &str = "Model not ready";
pub const INFERENCE_ERROR_MESSAGE: &str = "Inference error";

/// Shared server state
pub struct ServerState {
    /// `None` when the model failed to load at startup
    pub model: Option<Mutex<IrisOnnxModel>>,
    pub class_names: Vec<String>,
}

impl ServerState {
    pub fn new(model: Option<IrisOnnxModel>, class_names: Vec<String>) -> Self {
        Self {
            model: model.map(Mutex::new),
            class_names,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IrisQuery {
    pub data: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IrisResponse {
    pub predicted: String,
    pub probabilities: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}

/// Parse the `data` query parameter; absent or empty means the default sample
pub fn parse_input_data(data: Option<&str>) -> Result<[f32; 4], &'static str> {
    let Some(text) = data.filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_SAMPLE.map(|v| v as f32));
    };
    let values = parse_feature_list(text, 4).map_err(|_| INVALID_DATA_MESSAGE)?;

    let mut features = [0.0f32; 4];
    for (slot, value) in features.iter_mut().zip(values) {
        *slot = value as f32;
    }
    // The graph runs in float32
    if features.iter().any(|v| !v.is_finite()) {
        return Err(INVALID_DATA_MESSAGE);
    }
    Ok(features)
}

/// Map a raw prediction to class names and whole-number percentages
pub fn format_inference_output(
    prediction: &OnnxPrediction,
    class_names: &[String],
) -> ExportResult<IrisResponse> {
    let predicted = usize::try_from(prediction.label)
        .ok()
        .and_then(|i| class_names.get(i))
        .ok_or_else(|| {
            errors::inference_error(
                "format_output",
                &format!("label {} has no class name", prediction.label),
            )
        })?
        .clone();

    let probabilities = class_names
        .iter()
        .zip(&prediction.probabilities)
        .map(|(name, p)| (name.clone(), format!("{:.0}%", p * 100.0)))
        .collect();

    Ok(IrisResponse {
        predicted,
        probabilities,
    })
}

pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.model.is_some(),
    })
}

fn run_inference(state: &ServerState, features: [f32; 4]) -> ExportResult<IrisResponse> {
    let model = state
        .model
        .as_ref()
        .ok_or_else(|| errors::inference_error("predict", MODEL_NOT_READY_MESSAGE))?;
    let input = Array2::from_shape_vec((1, 4), features.to_vec())
        .map_err(|e| errors::inference_error("build_input", &e.to_string()))?;

    let predictions = model.lock().predict(input.view())?;
    let first = predictions
        .first()
        .ok_or_else(|| errors::inference_error("predict", "empty output"))?;
    format_inference_output(first, &state.class_names)
}

/// `GET /iris?data=5.1,3.5,1.4,0.2`
pub async fn predict_iris(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<IrisQuery>,
) -> Response {
    if state.model.is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, MODEL_NOT_READY_MESSAGE).into_response();
    }

    let features = match parse_input_data(query.data.as_deref()) {
        Ok(features) => features,
        Err(message) => {
            tracing::debug!(data = ?query.data, "rejected input");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    // ONNX Runtime is CPU-bound; keep it off the async workers
    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || run_inference(&worker_state, features))
        .await
        .unwrap_or_else(|e| Err(errors::inference_error("spawn_blocking", &e.to_string())));

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Inference failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, INFERENCE_ERROR_MESSAGE).into_response()
        }
    }
}
