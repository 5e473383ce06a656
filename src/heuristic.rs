use serde::{Deserialize, Serialize};

use crate::errors::{HepatitisError, HepatitisResult};
use crate::features::{FeatureVector, FEATURE_COUNT, FIELD_ORDER};

/// Weight and normalizing divisor per feature, plus the logistic offset.
///
/// A feature contributes `value / divisor * weight` to the risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub weights: [f64; FEATURE_COUNT],
    pub divisors: [f64; FEATURE_COUNT],
    pub offset: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            weights: [
                0.3,  // Age
                0.1,  // Sex
                0.0,  // Estado_Civil
                0.0,  // Ciudad
                0.2,  // Steroid
                0.15, // Antivirals
                0.15, // Fatigue
                0.1,  // Malaise
                0.15, // Anorexia
                0.25, // Liver_Big
                0.2,  // Liver_Firm
                0.2,  // Spleen_Palpable
                0.3,  // Spiders
                0.35, // Ascites
                0.25, // Varices
                0.3,  // Bilirubin
                0.15, // Alk_Phosphate
                0.2,  // Sgot
                0.1,  // Albumin
                0.15, // Protime
                0.4,  // Histology
            ],
            divisors: [
                100.0, // Age
                1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
                5.0,   // Bilirubin
                100.0, // Alk_Phosphate
                100.0, // Sgot
                5.0,   // Albumin
                15.0,  // Protime
                1.0,   // Histology
            ],
            offset: 1.5,
        }
    }
}

impl HeuristicWeights {
    /// Every weight finite, every divisor finite and non-zero, finite offset.
    pub fn validate(&self) -> HepatitisResult<()> {
        for (name, (weight, divisor)) in FIELD_ORDER
            .iter()
            .zip(self.weights.iter().zip(self.divisors.iter()))
        {
            if !weight.is_finite() {
                return Err(HepatitisError::config(format!(
                    "predictor.heuristic weight for {name} must be a finite number"
                )));
            }
            if !divisor.is_finite() || *divisor == 0.0 {
                return Err(HepatitisError::config(format!(
                    "predictor.heuristic divisor for {name} must be finite and non-zero"
                )));
            }
        }
        if !self.offset.is_finite() {
            return Err(HepatitisError::config(
                "predictor.heuristic offset must be a finite number",
            ));
        }
        Ok(())
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Closed-form hepatitis risk scorer used when no trained model is deployed.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: HeuristicWeights,
}

impl HeuristicScorer {
    pub fn new(weights: HeuristicWeights) -> Self {
        Self { weights }
    }

    /// Weighted sum of the normalized features.
    pub fn risk_score(&self, features: &FeatureVector) -> f64 {
        features
            .as_slice()
            .iter()
            .zip(self.weights.weights.iter().zip(self.weights.divisors.iter()))
            .map(|(value, (weight, divisor))| value / divisor * weight)
            .sum()
    }

    /// `(probability_negative, probability_positive)` for a feature vector.
    pub fn probabilities(&self, features: &FeatureVector) -> (f64, f64) {
        let positive = sigmoid(self.risk_score(features) - self.weights.offset);
        (1.0 - positive, positive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{encode, FeatureDefaults};
    use serde_json::{json, Map};

    fn vector(value: serde_json::Value) -> FeatureVector {
        let payload = value.as_object().cloned().unwrap_or_else(Map::new);
        encode(&payload, &FeatureDefaults::default()).unwrap()
    }

    #[test]
    fn default_record_scores_lab_terms_only() {
        let scorer = HeuristicScorer::default();
        let features = vector(json!({ "sex": "Femenino", "estado_civil": "Soltero" }));
        // 0.5/5*0.3 + 50/100*0.15 + 25/100*0.2 + 4/5*0.1 + 12/15*0.15
        let score = scorer.risk_score(&features);
        assert!((score - 0.355).abs() < 1e-9, "score was {score}");

        let (negative, positive) = scorer.probabilities(&features);
        assert!((positive - sigmoid(-1.145)).abs() < 1e-12);
        assert!((positive - 0.2414).abs() < 1e-4);
        assert!(positive < 0.5);
        assert!((negative + positive - 1.0).abs() < 1e-9);
    }

    #[test]
    fn high_risk_record_crosses_threshold() {
        let scorer = HeuristicScorer::default();
        let features = vector(json!({
            "age": 60,
            "sex": "Masculino",
            "ascites": "Si",
            "varices": "Si",
            "spiders": "Sí",
            "histology": "Si",
            "bilirubin": 3.5,
        }));
        let (_, positive) = scorer.probabilities(&features);
        assert!(positive >= 0.5, "positive was {positive}");
    }

    #[test]
    fn marital_status_and_city_do_not_move_score() {
        let scorer = HeuristicScorer::default();
        let base = scorer.risk_score(&vector(json!({})));
        let other = scorer.risk_score(&vector(json!({ "estado_civil": "Viudo", "ciudad_code": 9 })));
        assert!((base - other).abs() < 1e-12);
    }

    #[test]
    fn default_weights_validate() {
        assert!(HeuristicWeights::default().validate().is_ok());
    }

    #[test]
    fn zero_divisor_and_non_finite_values_are_rejected() {
        let mut weights = HeuristicWeights::default();
        weights.divisors[1] = 0.0;
        let err = weights.validate().unwrap_err();
        assert!(err.to_string().contains("divisor for Sex"));

        let mut weights = HeuristicWeights::default();
        weights.weights[20] = f64::INFINITY;
        let err = weights.validate().unwrap_err();
        assert!(err.to_string().contains("weight for Histology"));

        let weights = HeuristicWeights {
            offset: f64::NAN,
            ..HeuristicWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
