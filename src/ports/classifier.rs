//! Classifier port: Trait for a trained binary classifier.

use crate::ScreeningError;

/// A trained binary classifier over positional feature rows.
///
/// Implementations must reject rows whose length differs from
/// `n_features()` with `ScreeningError::ModelInvocation`; they must never pad
/// or truncate.
pub trait Classifier: Send + Sync {
    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Feature names in training order, as recorded by the artifact.
    fn feature_names(&self) -> &[String];

    /// Hard class decision (0 or 1).
    ///
    /// # Errors
    /// Returns `ScreeningError::ModelInvocation` on shape mismatch or failure.
    fn predict(&self, row: &[f64]) -> Result<u8, ScreeningError>;

    /// Class probabilities `[p(class 0), p(class 1)]`.
    ///
    /// # Errors
    /// Returns `ScreeningError::ModelInvocation` on shape mismatch or failure.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ScreeningError>;
}
