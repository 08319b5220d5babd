//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use iris_ml::load_iris;
use iris_onnx::server::handlers::INVALID_DATA_MESSAGE;
use iris_onnx::server::{router, ServerState};
use iris_onnx::{export_iris_knn, ConvertOptions, IrisOnnxModel};
use rstest::*;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn class_names() -> Vec<String> {
    load_iris().unwrap().target_names
}

fn app_without_model() -> Router {
    router(Arc::new(ServerState::new(None, class_names())))
}

/// Router over a freshly exported model; the directory must outlive the app
fn app_with_model() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iris_knn_model.onnx");
    export_iris_knn(&path, ConvertOptions { zipmap: false }, false).unwrap();
    let model = IrisOnnxModel::load(&path).unwrap();
    let app = router(Arc::new(ServerState::new(Some(model), class_names())));
    (dir, app)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_reports_missing_model() {
    let (status, body) = get(app_without_model(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);
}

#[tokio::test]
async fn test_iris_without_model_is_unavailable() {
    let (status, body) = get(app_without_model(), "/iris?data=5.1,3.5,1.4,0.2").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Model not ready");
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (_dir, app) = app_with_model();
    let (_, body) = get(app, "/health").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["model_loaded"], true);
}

#[rstest]
#[case("/iris", "setosa")]
#[case("/iris?data=", "setosa")]
#[case("/iris?data=5.1,3.5,1.4,0.2", "setosa")]
#[case("/iris?data=7.7,3.8,6.7,2.2", "virginica")]
#[tokio::test]
async fn test_iris_prediction(#[case] uri: &str, #[case] expected: &str) {
    let (_dir, app) = app_with_model();
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["predicted"], expected);
    assert_eq!(json["probabilities"][expected], "100%");
    assert_eq!(json["probabilities"].as_object().unwrap().len(), 3);
}

#[rstest]
#[case("/iris?data=1,2,3")]
#[case("/iris?data=a,b,c,d")]
#[case("/iris?data=1e200,3.5,1.4,0.2")]
#[tokio::test]
async fn test_iris_rejects_bad_data(#[case] uri: &str) {
    let (_dir, app) = app_with_model();
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, INVALID_DATA_MESSAGE);
}
