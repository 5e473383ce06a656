use serde::{Deserialize, Serialize};

pub const POSITIVE_LABEL: &str = "Positivo para Hepatitis";
pub const NEGATIVE_LABEL: &str = "Negativo para Hepatitis";

/// JSON body returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: u8,
    pub probability_negative: f64,
    pub probability_positive: f64,
    pub result: String,
}

impl PredictionResult {
    pub fn from_probabilities(prediction: u8, probability_negative: f64, probability_positive: f64) -> Self {
        let prediction = u8::from(prediction == 1);
        let result = if prediction == 1 {
            POSITIVE_LABEL
        } else {
            NEGATIVE_LABEL
        };

        Self {
            prediction,
            probability_negative,
            probability_positive,
            result: result.to_string(),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.prediction == 1
    }
}
