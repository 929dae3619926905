//! Screening result types.
//!
//! Represents the classifier's verdict, the per-feature attribution that
//! explains it, and the report handed to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::domain::features::FeatureVector;
use crate::ScreeningError;

/// Default number of rows shown in a waterfall chart.
pub const DEFAULT_MAX_DISPLAY: usize = 10;

/// Binary risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    LowRisk,
    HighRisk,
}

impl RiskLabel {
    /// Map the classifier's own class decision to a label.
    ///
    /// # Errors
    /// Returns `ModelInvocation` for anything other than class 0 or 1.
    pub fn from_class(class: u8) -> Result<Self, ScreeningError> {
        match class {
            0 => Ok(Self::LowRisk),
            1 => Ok(Self::HighRisk),
            other => Err(ScreeningError::ModelInvocation(format!(
                "Classifier returned unknown class {other}"
            ))),
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::LowRisk => "Low risk (negative)",
            Self::HighRisk => "High risk (positive)",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowRisk => write!(f, "LOW RISK"),
            Self::HighRisk => write!(f, "HIGH RISK"),
        }
    }
}

/// Result of the classifier for one input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The classifier's hard decision
    pub label: RiskLabel,

    /// Positive-class probability (0.0 to 1.0)
    pub probability: f64,
}

impl PredictionResult {
    #[must_use]
    pub fn new(label: RiskLabel, probability: f64) -> Self {
        Self { label, probability }
    }

    /// Probability of the reported label.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self.label {
            RiskLabel::HighRisk => self.probability,
            RiskLabel::LowRisk => 1.0 - self.probability,
        }
    }
}

/// Signed contribution of one feature to a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub name: String,
    /// Model-space (scaled) value of the feature for this input
    pub feature_value: f64,
    pub contribution: f64,
}

/// Per-feature breakdown of one prediction relative to a baseline.
///
/// `base_value + sum(contributions)` reproduces `model_output` up to
/// floating-point error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    /// Expected model output over the reference sample
    pub base_value: f64,

    /// Model output being explained (positive-class probability)
    pub model_output: f64,

    /// One entry per feature, in training order
    pub contributions: Vec<FeatureContribution>,
}

/// One row of a waterfall chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallRow {
    pub label: String,
    /// `None` for the folded "other features" row
    pub feature_value: Option<f64>,
    pub contribution: f64,
}

impl AttributionResult {
    /// Build from contributions given in training order.
    #[must_use]
    pub fn new(base_value: f64, model_output: f64, instance: &FeatureVector, values: &[f64]) -> Self {
        let contributions = instance
            .named()
            .zip(values)
            .map(|((name, feature_value), &contribution)| FeatureContribution {
                name: name.to_string(),
                feature_value,
                contribution,
            })
            .collect();
        Self {
            base_value,
            model_output,
            contributions,
        }
    }

    #[must_use]
    pub fn total_contribution(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Distance between `base_value + sum(contributions)` and `model_output`.
    #[must_use]
    pub fn additivity_gap(&self) -> f64 {
        (self.base_value + self.total_contribution() - self.model_output).abs()
    }

    /// Waterfall rows ranked by absolute contribution.
    ///
    /// When there are more features than `max_display`, the smallest ones are
    /// folded into a single trailing "N other features" row so the chart still
    /// sums to the model output.
    #[must_use]
    pub fn ranked(&self, max_display: usize) -> Vec<WaterfallRow> {
        let max_display = max_display.max(1);
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

        let shown = if sorted.len() > max_display {
            max_display - 1
        } else {
            sorted.len()
        };

        let mut rows: Vec<WaterfallRow> = sorted[..shown]
            .iter()
            .map(|c| WaterfallRow {
                label: c.name.clone(),
                feature_value: Some(c.feature_value),
                contribution: c.contribution,
            })
            .collect();

        let rest = &sorted[shown..];
        if !rest.is_empty() {
            rows.push(WaterfallRow {
                label: format!("{} other features", rest.len()),
                feature_value: None,
                contribution: rest.iter().map(|c| c.contribution).sum(),
            });
        }
        rows
    }
}

/// Outcome of the attribution stage, which may fail without invalidating
/// the prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplanationOutcome {
    Available(AttributionResult),
    Unavailable { reason: String },
    Skipped,
}

impl ExplanationOutcome {
    #[must_use]
    pub fn attribution(&self) -> Option<&AttributionResult> {
        match self {
            Self::Available(a) => Some(a),
            _ => None,
        }
    }
}

/// Everything produced by one screening cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    /// Encoded input before scaling
    pub features: FeatureVector,

    /// Model input after scaling
    pub scaled: FeatureVector,

    pub prediction: PredictionResult,

    pub explanation: ExplanationOutcome,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
