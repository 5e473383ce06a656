use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::api_errors::AppError;
use crate::app_state::AppState;
use crate::errors::HepatitisError;
use crate::features::encode;
use crate::response::PredictionResult;

/// Prediction request body: a JSON object or a form-encoded field list.
#[derive(Debug, Clone, Default)]
pub struct PredictPayload(pub Map<String, Value>);

enum BodyKind {
    Json,
    Form,
}

/// Media type of the request, ignoring parameters such as `charset`.
fn body_kind(req: &Request) -> Result<BodyKind, HepatitisError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "application/x-www-form-urlencoded" => Ok(BodyKind::Form),
        "application/json" => Ok(BodyKind::Json),
        other if other.starts_with("application/") && other.ends_with("+json") => Ok(BodyKind::Json),
        "" => Err(HepatitisError::malformed_body("missing Content-Type header")),
        other => Err(HepatitisError::malformed_body(format!(
            "unsupported content type '{other}', expected application/json or application/x-www-form-urlencoded"
        ))),
    }
}

impl<S> FromRequest<S> for PredictPayload
where
    S: Send + Sync,
{
    type Rejection = HepatitisError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match body_kind(&req)? {
            BodyKind::Form => {
                let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| HepatitisError::malformed_body(e.body_text()))?;
                Ok(PredictPayload(
                    fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
                ))
            }
            BodyKind::Json => {
                let body = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| HepatitisError::malformed_body(e.body_text()))?;
                match serde_json::from_slice::<Value>(&body) {
                    Ok(Value::Object(map)) => Ok(PredictPayload(map)),
                    Ok(_) => Err(HepatitisError::malformed_body("request body must be a JSON object")),
                    Err(e) => Err(HepatitisError::malformed_body(format!("invalid JSON body: {e}"))),
                }
            }
        }
    }
}

/// Build the service router.
pub fn build_router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let router = Router::new()
        .route("/predict", post(predict))
        .route("/api/model/status", get(model_status))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_to_bad_request))
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[axum::debug_handler]
async fn predict(
    State(state): State<Arc<AppState>>,
    PredictPayload(payload): PredictPayload,
) -> Result<Json<PredictionResult>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id, predictor = state.predictor.kind());

    span.in_scope(|| -> Result<Json<PredictionResult>, AppError> {
        let features = encode(&payload, &state.defaults)?;
        debug!(features = ?features.named().collect::<Vec<_>>(), "encoded request");

        let result = state.predictor.predict(&features)?;
        info!(
            prediction = result.prediction,
            probability_positive = result.probability_positive,
            "prediction served"
        );
        Ok(Json(result))
    })
}

async fn model_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.status())
}

async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readyz(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "ready": state.predictor.is_available(),
        "predictor": state.predictor.kind(),
    }))
}

fn panic_to_bad_request(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected failure while handling request".to_string()
    };
    tracing::error!(%message, "request handler panicked");
    AppError::bad_request(message).into_response()
}
