//! Attribution port: Trait for per-feature explanation of one prediction.

use crate::domain::{AttributionResult, FeatureVector, ReferenceSample};
use crate::ports::Classifier;
use crate::ScreeningError;

/// A model-agnostic attribution method.
///
/// Implementations explain the classifier's positive-class probability for
/// `instance` against the `reference` background rows.
pub trait AttributionEngine: Send + Sync {
    /// # Errors
    /// Returns `ScreeningError::ExplainerUnavailable` if the attribution
    /// cannot be computed.
    fn attribute(
        &self,
        instance: &FeatureVector,
        model: &dyn Classifier,
        reference: &ReferenceSample,
    ) -> Result<AttributionResult, ScreeningError>;
}
