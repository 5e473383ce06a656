//! Predictor adapter.
//!
//! One adapter, three states chosen once at start-up: the closed-form
//! heuristic, a loaded model, or a model that was configured but could not be
//! loaded. Nothing here is mutated after construction.

use tracing::debug;

use crate::errors::{HepatitisError, HepatitisResult};
use crate::features::FeatureVector;
use crate::heuristic::HeuristicScorer;
use crate::model::{class_indices, Classifier, Scaler};
use crate::response::PredictionResult;

/// A classifier with its optional preprocessing step.
pub struct ModelPredictor {
    classifier: Box<dyn Classifier>,
    scaler: Option<Box<dyn Scaler>>,
}

impl ModelPredictor {
    pub fn new(classifier: Box<dyn Classifier>, scaler: Option<Box<dyn Scaler>>) -> Self {
        Self { classifier, scaler }
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn scaler_kind(&self) -> Option<&'static str> {
        self.scaler.as_ref().map(|s| s.kind())
    }

    pub fn predict(&self, features: &FeatureVector) -> HepatitisResult<PredictionResult> {
        let input = match &self.scaler {
            Some(scaler) => scaler.transform(features.as_slice())?,
            None => features.as_slice().to_vec(),
        };

        let proba = self.classifier.predict_proba(&input)?;
        if proba.len() != 2 {
            return Err(HepatitisError::prediction(format!(
                "expected two class probabilities, got {}",
                proba.len()
            )));
        }

        let (negative, positive) = class_indices(self.classifier.classes());
        let (p_neg, p_pos) = (proba[negative], proba[positive]);
        if !(0.0..=1.0).contains(&p_neg) || !(0.0..=1.0).contains(&p_pos) {
            return Err(HepatitisError::prediction(format!(
                "probabilities out of range: [{p_neg}, {p_pos}]"
            )));
        }
        let total = p_neg + p_pos;
        if total <= 0.0 {
            return Err(HepatitisError::prediction("probabilities sum to zero"));
        }
        let p_pos = p_pos / total;

        let label = self.classifier.predict(&input)?;
        debug!(label, p_pos, "model prediction");
        if (label == 1) != (p_pos >= 0.5) {
            return Err(HepatitisError::prediction(format!(
                "classifier label {label} disagrees with positive probability {p_pos}"
            )));
        }

        Ok(PredictionResult::from_probabilities(
            u8::from(label == 1),
            1.0 - p_pos,
            p_pos,
        ))
    }
}

pub enum Predictor {
    Heuristic(HeuristicScorer),
    Model(ModelPredictor),
    Unavailable { reason: String },
}

impl Predictor {
    pub fn heuristic() -> Self {
        Predictor::Heuristic(HeuristicScorer::default())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Predictor::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Predictor::Heuristic(_) => "heuristic",
            Predictor::Model(_) | Predictor::Unavailable { .. } => "model",
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Predictor::Unavailable { .. })
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Predictor::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> HepatitisResult<PredictionResult> {
        match self {
            Predictor::Heuristic(scorer) => {
                let (p_neg, p_pos) = scorer.probabilities(features);
                Ok(PredictionResult::from_probabilities(
                    u8::from(p_pos >= 0.5),
                    p_neg,
                    p_pos,
                ))
            }
            Predictor::Model(model) => model.predict(features),
            Predictor::Unavailable { reason } => Err(HepatitisError::model_unavailable(reason.clone())),
        }
    }
}
