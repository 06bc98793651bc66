use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::{engine::PredictionEngine, error::AppError, types::PredictResponse};

pub const LIVENESS_MESSAGE: &str = "Phishing URL Detection API is running";

#[derive(Clone)]
pub struct AppState {
    pub engine: PredictionEngine,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(DefaultBodyLimit::disable())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

/// Pulls a usable URL out of a raw request body. Anything other than a JSON
/// object with a string `url` yields `None`.
fn url_from_body(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload.get("url")?.as_str().map(str::to_string)
}

async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let url = url_from_body(&body);
    let result = state.engine.predict(url.as_deref());

    if let Err(e) = &result {
        metrics::counter!("prediction_errors_total").increment(1);
        if matches!(e, AppError::MissingInput) {
            warn!("Rejected prediction request without a URL");
        }
    }

    Ok(Json(result?))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.engine.model_info(),
    }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
