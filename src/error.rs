use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const MISSING_URL_MESSAGE: &str = "URL not provided";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("URL not provided")]
    MissingInput,

    #[error("Classification model unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Model inference error: {0}")]
    ModelInference(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput => StatusCode::BAD_REQUEST,
            AppError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::MissingInput => MISSING_URL_MESSAGE.to_string(),
            AppError::OracleUnavailable(_) => self.to_string(),
            _ => {
                tracing::error!("Internal server error: {}", self);
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

// Helper function for creating inference errors
pub fn inference_error(msg: &str) -> AppError {
    AppError::ModelInference(msg.to_string())
}
