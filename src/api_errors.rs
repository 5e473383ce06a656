use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::HepatitisError;

/// HTTP-facing error. Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status();
        let msg = match self {
            AppError::BadRequest(s) | AppError::ServiceUnavailable(s) => s,
        };
        (code, Json(ErrBody { error: msg })).into_response()
    }
}

impl From<HepatitisError> for AppError {
    fn from(err: HepatitisError) -> Self {
        let status = err.status();
        let msg = err.to_string();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            AppError::ServiceUnavailable(msg)
        } else {
            AppError::BadRequest(msg)
        }
    }
}
