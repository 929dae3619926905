//! Ports layer: Trait definitions for the black-box collaborators.
//!
//! The classifier, the scaler, the attribution method and the reference data
//! source are all externally supplied. The core relies only on these narrow
//! contracts, never on their internals.

mod attribution;
mod classifier;
mod reference;
mod scaler;

pub use attribution::AttributionEngine;
pub use classifier::Classifier;
pub use reference::ReferenceSource;
pub use scaler::FeatureScaler;
