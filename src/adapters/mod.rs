//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: JSON classifier/scaler artifacts and the integrity manifest
//! - `kernel`: Kernel SHAP attribution engine
//! - `reference`: CSV reference table loader and the process-wide cache
//! - `sanitize`: clinical-value filtering for logs

pub mod artifacts;
pub mod kernel;
pub mod reference;
pub mod sanitize;

pub use artifacts::{ArtifactSet, LogisticRegression, ScalerArtifact};
pub use kernel::KernelExplainer;
pub use reference::{CsvReferenceSource, ReferenceCache};
