//! Pipeline stages between the encoder and the presentation layer.
//!
//! Each stage wraps one black-box collaborator and enforces its contract:
//! the scaler sees exactly the five continuous slots, the classifier sees the
//! full 15-slot row, and the attribution engine sees the scaled row.

use crate::domain::{
    check_schema, AttributionResult, FeatureVector, PredictionResult, ReferenceSample, RiskLabel,
    FEATURE_COUNT, FEATURE_NAMES, SCALED_COUNT, SCALED_FEATURES,
};
use crate::ports::{AttributionEngine, Classifier, FeatureScaler};
use crate::ScreeningError;

/// Apply the fitted scaler to the continuous slots, leaving the rest untouched.
///
/// # Errors
/// `SchemaMismatch` if the scaler was fitted on anything other than
/// `SCALED_FEATURES` in order, or returns the wrong number of values.
pub fn scale(
    features: &FeatureVector,
    scaler: &dyn FeatureScaler,
) -> Result<FeatureVector, ScreeningError> {
    check_schema(scaler.feature_names(), &SCALED_FEATURES)?;

    let transformed = scaler.transform(&features.scaled_slice())?;
    let scaled: [f64; SCALED_COUNT] = transformed.as_slice().try_into().map_err(|_| {
        ScreeningError::SchemaMismatch(format!(
            "Scaler returned {} values, expected {SCALED_COUNT}",
            transformed.len()
        ))
    })?;

    Ok(features.with_scaled_slice(scaled))
}

/// Score a scaled row.
///
/// The label comes from the classifier's own decision, never from
/// re-thresholding the probability.
///
/// # Errors
/// `ModelInvocation` if the model's input width differs from the feature
/// vector or the model returns an invalid probability; `SchemaMismatch` if
/// the model records feature names in a different order.
pub fn predict(
    scaled: &FeatureVector,
    model: &dyn Classifier,
) -> Result<PredictionResult, ScreeningError> {
    if model.n_features() != FEATURE_COUNT {
        return Err(ScreeningError::ModelInvocation(format!(
            "Model expects {} features, encoder produces {FEATURE_COUNT}",
            model.n_features()
        )));
    }
    if !model.feature_names().is_empty() {
        check_schema(model.feature_names(), &FEATURE_NAMES)?;
    }

    let row = scaled.to_array();
    let label = RiskLabel::from_class(model.predict(&row)?)?;
    let probability = model.predict_proba(&row)?[1];
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(ScreeningError::ModelInvocation(format!(
            "Positive-class probability {probability} outside [0, 1]"
        )));
    }

    Ok(PredictionResult::new(label, probability))
}

/// Attribute a prediction against the reference sample.
///
/// # Errors
/// Every failure is reported as `ExplainerUnavailable`.
pub fn explain(
    scaled: &FeatureVector,
    model: &dyn Classifier,
    engine: &dyn AttributionEngine,
    reference: &ReferenceSample,
) -> Result<AttributionResult, ScreeningError> {
    engine
        .attribute(scaled, model, reference)
        .map_err(|e| match e {
            ScreeningError::ExplainerUnavailable(_) => e,
            other => ScreeningError::ExplainerUnavailable(other.to_string()),
        })
}
