//! Artifact adapter: Classifier and scaler exported from the training pipeline.
//!
//! The fitted estimators are exported as JSON parameter files. This module
//! loads them, checks them against the feature contract and implements the
//! `Classifier` / `FeatureScaler` ports on top of them.
//!
//! # Integrity
//!
//! An optional `manifest.json` binds artifact files to SHA-256 digests:
//!
//! ```json
//! { "version": 1, "files": { "model.json": "<hex>", "scaler.json": "<hex>" } }
//! ```
//!
//! When present, every listed file must exist and match, and both the
//! classifier and the scaler must be listed. When the config requires a
//! manifest, a missing one is a load failure.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ScreeningConfig;
use crate::domain::{FEATURE_NAMES, SCALED_FEATURES};
use crate::ports::{Classifier, FeatureScaler};
use crate::ScreeningError;

const LOGISTIC_KIND: &str = "logistic_regression";

/// Logistic regression parameters exported from the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub kind: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Class labels in probability-column order
    #[serde(default = "default_classes")]
    pub classes: Vec<u8>,
}

fn default_classes() -> Vec<u8> {
    vec![0, 1]
}

impl LogisticRegression {
    /// Build a model directly from fitted parameters.
    #[must_use]
    pub fn new(feature_names: Vec<String>, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            kind: LOGISTIC_KIND.to_string(),
            feature_names,
            coefficients,
            intercept,
            classes: default_classes(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.kind != LOGISTIC_KIND {
            return Err(format!("unsupported classifier kind '{}'", self.kind));
        }
        if self.feature_names.is_empty() {
            return Err("classifier declares no features".into());
        }
        if self.coefficients.len() != self.feature_names.len() {
            return Err(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            ));
        }
        if self.classes != [0, 1] {
            return Err(format!("expected classes [0, 1], got {:?}", self.classes));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("non-finite model parameter".into());
        }
        Ok(())
    }

    fn check_shape(&self, row: &[f64]) -> Result<(), ScreeningError> {
        if row.len() != self.coefficients.len() {
            return Err(ScreeningError::ModelInvocation(format!(
                "Model expects {} features, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }
        Ok(())
    }

    /// Linear decision value `w . x + b` (log-odds of the positive class).
    ///
    /// # Errors
    /// Returns `ModelInvocation` on shape mismatch.
    pub fn decision_function(&self, row: &[f64]) -> Result<f64, ScreeningError> {
        self.check_shape(row)?;
        let z = self
            .coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        if z.is_finite() {
            Ok(z)
        } else {
            Err(ScreeningError::ModelInvocation(
                "Non-finite decision value".into(),
            ))
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &[f64]) -> Result<u8, ScreeningError> {
        let z = self.decision_function(row)?;
        Ok(if z > 0.0 { self.classes[1] } else { self.classes[0] })
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ScreeningError> {
        let p = sigmoid(self.decision_function(row)?);
        Ok([1.0 - p, p])
    }
}

/// Fitted scaler parameters exported from the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    /// `(x - mean) / scale`
    Standard {
        feature_names: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// `x * scale + min`
    MinMax {
        feature_names: Vec<String>,
        scale: Vec<f64>,
        min: Vec<f64>,
    },
}

impl ScalerArtifact {
    fn validate(&self) -> Result<(), String> {
        let (names, a, b) = match self {
            Self::Standard {
                feature_names,
                mean,
                scale,
            } => {
                if scale.iter().any(|s| *s == 0.0) {
                    return Err("standard scaler has a zero scale".into());
                }
                (feature_names, mean, scale)
            }
            Self::MinMax {
                feature_names,
                scale,
                min,
            } => (feature_names, scale, min),
        };
        if a.len() != names.len() || b.len() != names.len() {
            return Err(format!(
                "parameter lengths {}/{} do not match {} features",
                a.len(),
                b.len(),
                names.len()
            ));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err("non-finite scaler parameter".into());
        }
        Ok(())
    }
}

impl FeatureScaler for ScalerArtifact {
    fn feature_names(&self) -> &[String] {
        match self {
            Self::Standard { feature_names, .. } | Self::MinMax { feature_names, .. } => {
                feature_names
            }
        }
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScreeningError> {
        let expected = self.feature_names().len();
        if row.len() != expected {
            return Err(ScreeningError::SchemaMismatch(format!(
                "Scaler fitted on {expected} features, got {}",
                row.len()
            )));
        }
        let out = match self {
            Self::Standard { mean, scale, .. } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            Self::MinMax { scale, min, .. } => row
                .iter()
                .zip(scale.iter().zip(min))
                .map(|(x, (s, m))| x * s + m)
                .collect(),
        };
        Ok(out)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

/// Hex-encoded SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Verify the integrity manifest, if any.
///
/// Returns whether a manifest was found and verified.
fn verify_manifest(config: &ScreeningConfig) -> Result<bool, ScreeningError> {
    let manifest_path = config.manifest_path();
    if !manifest_path.exists() {
        if config.require_manifest {
            tracing::error!("Artifact manifest not found at {:?}", manifest_path);
            return Err(ScreeningError::artifact(
                "manifest.json",
                "integrity manifest required but not found",
            ));
        }
        tracing::warn!("Loading artifacts without an integrity manifest");
        return Ok(false);
    }

    let content = std::fs::read(&manifest_path)
        .map_err(|e| ScreeningError::artifact("manifest.json", e))?;
    let manifest: ArtifactManifest = serde_json::from_slice(&content)
        .map_err(|e| ScreeningError::artifact("manifest.json", format!("invalid format: {e}")))?;

    if manifest.version != 1 {
        return Err(ScreeningError::artifact(
            "manifest.json",
            format!("unsupported manifest version {}", manifest.version),
        ));
    }
    for required in [&config.model_file, &config.scaler_file] {
        if !manifest.files.contains_key(required) {
            return Err(ScreeningError::artifact(
                "manifest.json",
                format!("manifest does not bind {required}"),
            ));
        }
    }

    for (rel, expected_hex) in &manifest.files {
        let path = config.artifact_dir.join(rel);
        let bytes = std::fs::read(&path).map_err(|e| {
            ScreeningError::artifact(rel.as_str(), format!("listed in manifest but unreadable: {e}"))
        })?;
        if !sha256_hex(&bytes).eq_ignore_ascii_case(expected_hex.trim()) {
            return Err(ScreeningError::artifact(rel.as_str(), "hash mismatch"));
        }
    }

    tracing::info!("Verified {} artifact(s) against manifest", manifest.files.len());
    Ok(true)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, name: &str) -> Result<T, ScreeningError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScreeningError::artifact(name, format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| ScreeningError::artifact(name, e))
}

/// Load and check the classifier artifact.
///
/// # Errors
/// `ArtifactLoad` if the file is missing or malformed, `SchemaMismatch` if
/// its feature list is not the 15-slot training order.
pub fn load_classifier(path: &Path) -> Result<LogisticRegression, ScreeningError> {
    let model: LogisticRegression = read_json(path, "classifier")?;
    model
        .validate()
        .map_err(|reason| ScreeningError::artifact("classifier", reason))?;
    crate::domain::check_schema(&model.feature_names, &FEATURE_NAMES)?;
    tracing::info!(
        "Loaded classifier from {:?} (kind={}, n_features={})",
        path,
        model.kind,
        model.n_features()
    );
    Ok(model)
}

/// Load and check the scaler artifact.
///
/// # Errors
/// `ArtifactLoad` if the file is missing or malformed, `SchemaMismatch` if it
/// was not fitted on exactly the five continuous features in order.
pub fn load_scaler(path: &Path) -> Result<ScalerArtifact, ScreeningError> {
    let scaler: ScalerArtifact = read_json(path, "scaler")?;
    scaler
        .validate()
        .map_err(|reason| ScreeningError::artifact("scaler", reason))?;
    crate::domain::check_schema(scaler.feature_names(), &SCALED_FEATURES)?;
    tracing::info!("Loaded scaler from {:?}", path);
    Ok(scaler)
}

/// The loaded, shareable classifier and scaler.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub classifier: Arc<LogisticRegression>,
    pub scaler: Arc<ScalerArtifact>,
    /// Whether a manifest was verified during loading
    pub verified: bool,
}

impl ArtifactSet {
    /// Load every artifact named by the config.
    ///
    /// # Errors
    /// Any failure is fatal to the session: no prediction is possible.
    pub fn load(config: &ScreeningConfig) -> Result<Self, ScreeningError> {
        let verified = verify_manifest(config)?;
        let classifier = load_classifier(&config.model_path())?;
        let scaler = load_scaler(&config.scaler_path())?;
        Ok(Self {
            classifier: Arc::new(classifier),
            scaler: Arc::new(scaler),
            verified,
        })
    }
}
