//! Reference data port: Trait for loading the attribution background.

use crate::domain::ReferenceSample;
use crate::ScreeningError;

/// Source of the background sample used by the attribution stage.
///
/// Loading is expected to be deterministic: two loads from the same source
/// must return identical samples.
pub trait ReferenceSource: Send + Sync {
    /// # Errors
    /// Returns `ScreeningError::ExplainerUnavailable` if the data cannot be
    /// read, or `ScreeningError::SchemaMismatch` if its columns disagree with
    /// the feature contract.
    fn load(&self) -> Result<ReferenceSample, ScreeningError>;

    /// Identity of the sample this source produces. Sources with equal keys
    /// may share a cached sample.
    fn cache_key(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
