//! Error handling for the hepatitis risk service
//!
//! Every failure the encoder, the predictor adapter or the artifact loader can
//! produce is a variant of [`HepatitisError`]. Load-time failures are folded
//! into the "model unavailable" state by the caller; request-time failures are
//! turned into JSON error bodies by the `IntoResponse` impl below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api_errors::AppError;

/// Main error type for the hepatitis risk service
#[derive(Error, Debug)]
pub enum HepatitisError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    #[error("Malformed request body: {message}")]
    MalformedBody { message: String },

    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Prediction failed: {message}")]
    Prediction { message: String },

    #[error("Invalid artifact {path}: {message}")]
    Artifact { path: String, message: String },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network operation failed: {operation}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
}

pub type HepatitisResult<T> = Result<T, HepatitisError>;

impl HepatitisError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid input error for a request field
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Create a model unavailable error
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn prediction(message: impl Into<String>) -> Self {
        Self::Prediction {
            message: message.into(),
        }
    }

    /// Create an artifact validation error
    pub fn artifact(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    /// Full message including the chain of sources, for log lines and
    /// unavailable reasons.
    pub fn detailed(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        message
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HepatitisError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            // Everything else surfaced during a request is reported as a bad
            // request, never as a server fault.
            HepatitisError::Config { .. }
            | HepatitisError::InvalidInput { .. }
            | HepatitisError::MalformedBody { .. }
            | HepatitisError::Prediction { .. }
            | HepatitisError::Artifact { .. }
            | HepatitisError::Serialization { .. }
            | HepatitisError::Io { .. }
            | HepatitisError::Network { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HepatitisError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

impl From<figment::Error> for HepatitisError {
    fn from(err: figment::Error) -> Self {
        HepatitisError::config(err.to_string())
    }
}
