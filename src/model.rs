//! Trained model artifacts.
//!
//! A deployed model is a [`Classifier`] optionally preceded by a [`Scaler`].
//! The built-in implementations read the JSON layouts below; other formats
//! plug in by implementing the traits.
//!
//! ```json
//! {"kind": "logistic_regression", "coefficients": [..21], "intercept": -1.2,
//!  "classes": [0, 1], "feature_names": ["Age", "Sex", ...]}
//! {"kind": "standard_scaler", "mean": [..21], "scale": [..21]}
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{HepatitisError, HepatitisResult};
use crate::features::{FEATURE_COUNT, FIELD_ORDER};
use crate::heuristic::sigmoid;

/// Opaque binary classifier.
pub trait Classifier: Send + Sync {
    /// Discrete class label for one feature vector.
    fn predict(&self, features: &[f64]) -> HepatitisResult<i64>;

    /// Class probabilities, indexed like [`Classifier::classes`].
    fn predict_proba(&self, features: &[f64]) -> HepatitisResult<Vec<f64>>;

    /// Ordered class labels, when the artifact records them.
    fn classes(&self) -> Option<&[i64]> {
        None
    }

    fn kind(&self) -> &'static str;
}

/// Fitted per-feature transform applied before classification.
pub trait Scaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> HepatitisResult<Vec<f64>>;

    fn kind(&self) -> &'static str;
}

/// `(negative, positive)` probability indices.
///
/// With a class list, the positive index is wherever label 1 sits and the
/// negative index is the other slot. Without one, index 1 is positive.
pub fn class_indices(classes: Option<&[i64]>) -> (usize, usize) {
    match classes.and_then(|labels| labels.iter().position(|label| *label == 1)) {
        Some(1) => (0, 1),
        Some(0) => (1, 0),
        _ => (0, 1),
    }
}

fn check_width(features: &[f64]) -> HepatitisResult<()> {
    if features.len() != FEATURE_COUNT {
        return Err(HepatitisError::prediction(format!(
            "expected {FEATURE_COUNT} features, got {}",
            features.len()
        )));
    }
    Ok(())
}

/// Binary logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub classes: Option<Vec<i64>>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl LogisticRegression {
    fn validate(&self, path: &str) -> HepatitisResult<()> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(HepatitisError::artifact(
                path,
                format!(
                    "expected {FEATURE_COUNT} coefficients, found {}",
                    self.coefficients.len()
                ),
            ));
        }
        if self.coefficients.iter().any(|c| !c.is_finite()) || !self.intercept.is_finite() {
            return Err(HepatitisError::artifact(path, "coefficients must be finite"));
        }
        if let Some(classes) = &self.classes {
            if classes.len() != 2 || !classes.contains(&1) {
                return Err(HepatitisError::artifact(
                    path,
                    format!("classes must be a binary label list containing 1, found {classes:?}"),
                ));
            }
        }
        if let Some(names) = &self.feature_names {
            if !names.iter().map(String::as_str).eq(FIELD_ORDER.iter().copied()) {
                return Err(HepatitisError::artifact(
                    path,
                    format!("feature order {names:?} does not match {FIELD_ORDER:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Probability of the class stored at index 1.
    fn second_class_probability(&self, features: &[f64]) -> HepatitisResult<f64> {
        check_width(features)?;
        let z = self.intercept
            + features
                .iter()
                .zip(self.coefficients.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>();
        Ok(sigmoid(z))
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[f64]) -> HepatitisResult<i64> {
        let proba = self.predict_proba(features)?;
        let (negative, positive) = class_indices(self.classes());
        let index = if proba[positive] >= 0.5 { positive } else { negative };
        match self.classes() {
            Some(classes) => classes.get(index).copied().ok_or_else(|| {
                HepatitisError::prediction(format!("no class label at index {index}"))
            }),
            None => Ok(index as i64),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> HepatitisResult<Vec<f64>> {
        let p1 = self.second_class_probability(features)?;
        Ok(vec![1.0 - p1, p1])
    }

    fn classes(&self) -> Option<&[i64]> {
        self.classes.as_deref()
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

/// Standardization: `(x - mean) / scale`, zero scales left as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&self, path: &str) -> HepatitisResult<()> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(HepatitisError::artifact(
                path,
                format!(
                    "expected {FEATURE_COUNT} mean/scale entries, found {}/{}",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(HepatitisError::artifact(path, "mean and scale must be finite"));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> HepatitisResult<Vec<f64>> {
        check_width(features)?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }

    fn kind(&self) -> &'static str {
        "standard_scaler"
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScalerArtifact {
    StandardScaler(StandardScaler),
}

/// Parse and validate a classifier artifact.
pub fn classifier_from_bytes(path: &str, bytes: &[u8]) -> HepatitisResult<Box<dyn Classifier>> {
    let artifact: ClassifierArtifact = serde_json::from_slice(bytes)
        .map_err(|e| HepatitisError::serialization(format!("parsing classifier {path}"), e))?;
    match artifact {
        ClassifierArtifact::LogisticRegression(model) => {
            model.validate(path)?;
            Ok(Box::new(model))
        }
    }
}

/// Parse and validate a scaler artifact.
pub fn scaler_from_bytes(path: &str, bytes: &[u8]) -> HepatitisResult<Box<dyn Scaler>> {
    let artifact: ScalerArtifact = serde_json::from_slice(bytes)
        .map_err(|e| HepatitisError::serialization(format!("parsing scaler {path}"), e))?;
    match artifact {
        ScalerArtifact::StandardScaler(scaler) => {
            scaler.validate(path)?;
            Ok(Box::new(scaler))
        }
    }
}

pub fn load_classifier(path: &Path) -> HepatitisResult<Box<dyn Classifier>> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path)
        .map_err(|e| HepatitisError::io(format!("reading classifier {display}"), e))?;
    classifier_from_bytes(&display, &bytes)
}

pub fn load_scaler(path: &Path) -> HepatitisResult<Box<dyn Scaler>> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path)
        .map_err(|e| HepatitisError::io(format!("reading scaler {display}"), e))?;
    scaler_from_bytes(&display, &bytes)
}
