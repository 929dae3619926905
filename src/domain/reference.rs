//! Background rows used as the attribution baseline.

use serde::{Deserialize, Serialize};

use crate::domain::features::FeatureVector;

/// A small, fixed subsample of the training feature table.
///
/// Rows are in model input space, the same space as the vector being explained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSample {
    rows: Vec<FeatureVector>,
}

impl ReferenceSample {
    #[must_use]
    pub fn new(rows: Vec<FeatureVector>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
