use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use etl_engine::EngineError;
use serde_json::json;
use thiserror::Error;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Engine(EngineError::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            AppError::Engine(EngineError::Fetch(err)) if err.is_cancelled() => {
                (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED")
            }
            AppError::Engine(EngineError::Fetch(_)) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Engine(EngineError::Payload(_)) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_PAYLOAD_ERROR")
            }
            AppError::Engine(EngineError::Export(_)) => (StatusCode::BAD_GATEWAY, "EXPORT_FAILED"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Engine(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, code, "Request failed");
        }

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
