//! Library root for the `hepatitis_risk` crate
//! Feature encoding, predictor adapter and HTTP surface for hepatitis risk scoring

// Error handling
pub mod api_errors;
pub mod errors;

// Feature schema & encoding
pub mod features;

// Predictors
pub mod heuristic;
pub mod model;
pub mod predictor;
pub mod response;

// Model artifacts
pub mod artifacts;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

// Web server interface
pub mod app_state;
pub mod web;


pub use errors::{HepatitisError, HepatitisResult};
pub use features::{encode, FeatureDefaults, FeatureVector, FEATURE_COUNT, FIELD_ORDER};
pub use predictor::Predictor;
pub use response::PredictionResult;
