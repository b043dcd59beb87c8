//! Error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_core::EngineError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Caller errors
    ValidationError(String),
    NotFound(String),

    // Engine not ready
    ModelUnavailable(String),
    InsufficientData(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::ModelUnavailable(msg)
            | AppError::InsufficientData(msg)
            | AppError::InternalError(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::ModelUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.as_str()),
            AppError::InsufficientData(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "status": "error",
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidEvent(_)
            | EngineError::InvalidLabel(_)
            | EngineError::InvalidConfig(_) => AppError::ValidationError(err.to_string()),
            EngineError::UnknownLog(_) => AppError::NotFound(err.to_string()),
            EngineError::ModelNotTrained => AppError::ModelUnavailable(err.to_string()),
            EngineError::InsufficientData { .. } => AppError::InsufficientData(err.to_string()),
            EngineError::LayoutMismatch { .. }
            | EngineError::Io(_)
            | EngineError::Serialization(_) => AppError::InternalError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("background task failed: {}", err))
    }
}
