// tests/web.rs
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use hepatitis_risk::{
    app_state::AppState,
    features::FeatureDefaults,
    model::{LogisticRegression, StandardScaler},
    predictor::{ModelPredictor, Predictor},
    web::build_router,
    FEATURE_COUNT,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for .oneshot()

fn heuristic_app() -> Router {
    let state = AppState::new(Predictor::heuristic(), FeatureDefaults::default());
    build_router(Arc::new(state), false)
}

fn model_app() -> Router {
    let mut coefficients = vec![0.0; FEATURE_COUNT];
    coefficients[15] = 1.5; // Bilirubin
    let model = LogisticRegression {
        coefficients,
        intercept: 0.0,
        classes: Some(vec![0, 1]),
        feature_names: None,
    };
    let mut mean = vec![0.0; FEATURE_COUNT];
    mean[15] = 1.0;
    let scaler = StandardScaler {
        mean,
        scale: vec![1.0; FEATURE_COUNT],
    };
    let predictor = Predictor::Model(ModelPredictor::new(Box::new(model), Some(Box::new(scaler))));
    build_router(
        Arc::new(AppState::new(predictor, FeatureDefaults::default())),
        false,
    )
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_val = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json_val)
}

#[tokio::test]
async fn predict_returns_200_with_default_payload() {
    let (status, body) = send(
        heuristic_app(),
        json_request("/predict", json!({ "sex": "Femenino", "estado_civil": "Soltero" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 0);
    assert_eq!(body["result"], "Negativo para Hepatitis");
    let positive = body["probability_positive"].as_f64().unwrap();
    let negative = body["probability_negative"].as_f64().unwrap();
    assert!((positive - 0.2414).abs() < 1e-4);
    assert!((positive + negative - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn predict_flags_high_risk_patient() {
    let (status, body) = send(
        heuristic_app(),
        json_request(
            "/predict",
            json!({
                "age": "65", "sex": "Masculino", "ascites": "Si", "varices": "Si",
                "spiders": "Sí", "histology": "Si", "bilirubin": "3.0", "sgot": 150
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["result"], "Positivo para Hepatitis");
}

#[tokio::test]
async fn predict_accepts_form_encoded_body() {
    let req = Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from("age=40&sex=Masculino&fatigue=Si&bilirubin=&histology=S%C3%AD"))
        .unwrap();
    let (status, body) = send(heuristic_app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["probability_positive"].as_f64().is_some());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn malformed_age_is_rejected_with_message() {
    let (status, body) = send(heuristic_app(), json_request("/predict", json!({ "age": "abc" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert!(message.contains("age"));
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let req = Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(heuristic_app(), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());

    let (status, body) = send(heuristic_app(), json_request("/predict", json!([1, 2, 3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("object"));
}

#[tokio::test]
async fn missing_model_returns_json_error_not_crash() {
    let state = AppState::new(
        Predictor::unavailable("reading model.json: No such file or directory"),
        FeatureDefaults::default(),
    );
    let app = build_router(Arc::new(state), false);

    let (status, body) = send(app.clone(), json_request("/predict", json!({ "age": 50 }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Model unavailable"));

    // Subsequent requests are unaffected.
    let (status, body) = send(app, json_request("/predict", json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn model_predictor_serves_scaled_predictions() {
    let (status, low) = send(model_app(), json_request("/predict", json!({ "bilirubin": 0.4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low["prediction"], 0);

    let (status, high) = send(model_app(), json_request("/predict", json!({ "bilirubin": "2.5" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(high["prediction"], 1);
    let positive = high["probability_positive"].as_f64().unwrap();
    assert!(positive >= 0.5);
}

#[tokio::test]
async fn health_and_readiness() {
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let (status, body) = send(heuristic_app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let req = Request::builder().uri("/readyz").body(Body::empty()).unwrap();
    let (_, body) = send(heuristic_app(), req).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["predictor"], "heuristic");

    let state = AppState::new(Predictor::unavailable("offline"), FeatureDefaults::default());
    let app = build_router(Arc::new(state), false);
    let req = Request::builder().uri("/api/model/status").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);
    assert_eq!(body["reason"], "offline");
}

#[tokio::test]
async fn get_on_predict_is_not_allowed() {
    let req = Request::builder().uri("/predict").body(Body::empty()).unwrap();
    let response = heuristic_app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

fn raw_request(content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().uri("/predict").method("POST");
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn unsupported_content_type_is_rejected() {
    let (status, body) = send(heuristic_app(), raw_request(Some("text/plain"), r#"{"age": 30}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Malformed request body"));
    assert!(message.contains("text/plain"));

    let (status, body) = send(heuristic_app(), raw_request(None, r#"{"age": 30}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn json_media_type_parameters_and_suffixes_are_accepted() {
    for content_type in ["application/json; charset=utf-8", "application/vnd.clinic+json", "Application/JSON"] {
        let (status, body) = send(heuristic_app(), raw_request(Some(content_type), r#"{"age": 30}"#)).await;
        assert_eq!(status, StatusCode::OK, "{content_type}");
        assert!(body["probability_positive"].as_f64().is_some());
    }
}
