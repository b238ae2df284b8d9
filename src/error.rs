//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::inference::InferenceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    BadRequest(String),
    PayloadTooLarge(String),

    // Remote Space errors
    ExternalServiceError(String),
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.as_str()),
            AppError::ExternalServiceError(msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.as_str())
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Inference service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.as_str())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ServiceMisconfigured { .. } => AppError::ServiceUnavailable(err.to_string()),
            InferenceError::InvalidImage(_) => AppError::BadRequest(err.to_string()),
            InferenceError::ConnectionFailure { .. }
            | InferenceError::MalformedResponse(_)
            | InferenceError::RemoteFailure(_) => AppError::ExternalServiceError(err.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}
