//! Domain layer: Core screening types and the feature encoder.
//!
//! This module contains pure Rust types with no I/O.
//! All types are serializable and implement strict validation.

mod diagnosis;
mod features;
mod patient;
mod reference;

pub use diagnosis::{
    AttributionResult, ExplanationOutcome, FeatureContribution, PredictionResult, RiskLabel,
    ScreeningReport, WaterfallRow, DEFAULT_MAX_DISPLAY,
};
pub(crate) use features::check_schema;
pub use features::{
    encode, FeatureVector, CHOLESTEROL_IMPUTATION, FEATURE_COUNT, FEATURE_NAMES, SCALED_COUNT,
    SCALED_FEATURES,
};
pub use patient::{ChestPainType, ClinicalInput, RestingEcg, Sex, StSlope};
pub use reference::ReferenceSample;
