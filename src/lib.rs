//! # Heartscreen
//!
//! Cardiac risk screening over externally trained artifacts.
//!
//! This crate provides:
//! - Deterministic encoding of clinical inputs into the 15-slot feature vector
//!   the classifier was trained on
//! - Scaling and prediction through loaded classifier/scaler artifacts
//! - Kernel SHAP attribution against a cached reference sample
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (ClinicalInput, FeatureVector, PredictionResult, AttributionResult)
//! - `ports`: Trait definitions for the black-box collaborators
//! - `adapters`: Concrete implementations (JSON artifacts, CSV reference data, Kernel SHAP)
//! - `application`: The screening pipeline and report rendering
//! - `config`: Environment-driven configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{
    encode, AttributionResult, ClinicalInput, FeatureVector, PredictionResult, RiskLabel,
};

/// Result type for Heartscreen operations
pub type Result<T> = std::result::Result<T, ScreeningError>;

/// Main error type for Heartscreen
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("Failed to load artifact {artifact}: {reason}")]
    ArtifactLoad { artifact: String, reason: String },

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Explainer unavailable: {0}")]
    ExplainerUnavailable(String),

    #[error("Invalid clinical input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScreeningError {
    pub(crate) fn artifact(artifact: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ArtifactLoad {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }
}
