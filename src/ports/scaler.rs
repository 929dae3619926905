//! Scaler port: Trait for a fitted numeric transform.

use crate::ScreeningError;

/// A transform fitted at training time on a fixed list of columns.
pub trait FeatureScaler: Send + Sync {
    /// Columns the transform was fitted on, in fit order.
    fn feature_names(&self) -> &[String];

    /// Apply the learned transform to one row in fit order.
    ///
    /// # Errors
    /// Returns `ScreeningError::SchemaMismatch` if the row length differs
    /// from the fitted column count.
    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScreeningError>;
}
