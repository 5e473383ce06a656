use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    artifacts::ArtifactFetcher,
    config_loader::{ArtifactsConfig, PredictorMode, ServiceConfig},
    errors::{HepatitisError, HepatitisResult},
    features::FeatureDefaults,
    heuristic::HeuristicScorer,
    model::{load_classifier, load_scaler},
    predictor::{ModelPredictor, Predictor},
};

/// Where the active model came from, reported by the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelProvenance {
    pub model_source: Option<String>,
    pub scaler_source: Option<String>,
    pub classifier_kind: Option<String>,
    pub scaler_kind: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Process-wide, read-only state shared by every request.
pub struct AppState {
    pub predictor: Predictor,
    pub defaults: FeatureDefaults,
    pub provenance: ModelProvenance,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(predictor: Predictor, defaults: FeatureDefaults) -> Self {
        Self {
            predictor,
            defaults,
            provenance: ModelProvenance::default(),
            started_at: Utc::now(),
        }
    }

    /// Start-up phase: build the configured predictor.
    ///
    /// Artifact failures never abort start-up; the state comes back with an
    /// unavailable predictor that explains itself on every request.
    pub async fn initialize(config: &ServiceConfig) -> Self {
        let mut provenance = ModelProvenance::default();

        let predictor = match config.predictor.mode {
            PredictorMode::Heuristic => {
                info!("using heuristic predictor");
                Predictor::Heuristic(HeuristicScorer::new(config.predictor.heuristic.clone()))
            }
            PredictorMode::Model => {
                provenance.model_source = config.artifacts.model.as_ref().map(|s| s.to_string());
                provenance.scaler_source = config.artifacts.scaler.as_ref().map(|s| s.to_string());

                match load_model_predictor(&config.artifacts).await {
                    Ok(model) => {
                        provenance.classifier_kind = Some(model.classifier_kind().to_string());
                        provenance.scaler_kind = model.scaler_kind().map(str::to_string);
                        provenance.loaded_at = Some(Utc::now());
                        info!(
                            model = ?provenance.model_source,
                            scaler = ?provenance.scaler_source,
                            "model artifacts loaded"
                        );
                        Predictor::Model(model)
                    }
                    Err(e) => {
                        let reason = e.detailed();
                        warn!(error = %reason, "model artifacts unavailable, serving error responses");
                        Predictor::unavailable(reason)
                    }
                }
            }
        };

        Self {
            predictor,
            defaults: config.defaults.clone(),
            provenance,
            started_at: Utc::now(),
        }
    }

    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "predictor": self.predictor.kind(),
            "available": self.predictor.is_available(),
            "reason": self.predictor.unavailable_reason(),
            "provenance": self.provenance,
            "started_at": self.started_at,
        })
    }
}

/// Acquire and parse the classifier and optional scaler.
pub async fn load_model_predictor(config: &ArtifactsConfig) -> HepatitisResult<ModelPredictor> {
    let model_source = config
        .model
        .as_ref()
        .ok_or_else(|| HepatitisError::model_unavailable("no model artifact configured"))?;

    let fetcher = ArtifactFetcher::new(config.cache_dir(), config.fetch_timeout())?;

    let model_path = fetcher
        .acquire(model_source, config.model_sha256.as_deref())
        .await?;
    let classifier = load_classifier(&model_path)?;

    let scaler = match &config.scaler {
        Some(source) => {
            let scaler_path = fetcher
                .acquire(source, config.scaler_sha256.as_deref())
                .await?;
            Some(load_scaler(&scaler_path)?)
        }
        None => None,
    };

    Ok(ModelPredictor::new(classifier, scaler))
}
