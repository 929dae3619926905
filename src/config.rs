//! Runtime configuration.
//!
//! All settings come from `HEARTSCREEN_*` environment variables with defaults
//! matching the exported training artifacts; the CLI may override them.

use std::path::{Path, PathBuf};

use crate::ScreeningError;

pub const ARTIFACT_DIR_ENV: &str = "HEARTSCREEN_ARTIFACT_DIR";
pub const MODEL_FILE_ENV: &str = "HEARTSCREEN_MODEL_FILE";
pub const SCALER_FILE_ENV: &str = "HEARTSCREEN_SCALER_FILE";
pub const REFERENCE_FILE_ENV: &str = "HEARTSCREEN_REFERENCE_FILE";
pub const TARGET_COLUMN_ENV: &str = "HEARTSCREEN_TARGET_COLUMN";
pub const SAMPLE_SIZE_ENV: &str = "HEARTSCREEN_REFERENCE_SAMPLE_SIZE";
pub const SEED_ENV: &str = "HEARTSCREEN_SEED";
pub const NSAMPLES_ENV: &str = "HEARTSCREEN_EXPLAINER_NSAMPLES";
pub const REQUIRE_MANIFEST_ENV: &str = "HEARTSCREEN_REQUIRE_MANIFEST";

pub const DEFAULT_MODEL_FILE: &str = "model.json";
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";
pub const DEFAULT_REFERENCE_FILE: &str = "encoded_data_train.csv";
pub const DEFAULT_TARGET_COLUMN: &str = "heartdisease";
pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_SEED: u64 = 42;

/// Settings for artifact loading and explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningConfig {
    /// Directory holding the classifier, scaler, reference table and manifest
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub reference_file: String,
    /// Label column dropped from the reference table
    pub target_column: String,
    /// Rows drawn from the reference table
    pub reference_sample_size: usize,
    /// Seed for reference subsampling and coalition sampling
    pub seed: u64,
    /// Coalition budget for the explainer (`None` = 2 * M + 2048)
    pub explainer_nsamples: Option<usize>,
    /// Refuse to load artifacts without an integrity manifest
    pub require_manifest: bool,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models"),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            scaler_file: DEFAULT_SCALER_FILE.to_string(),
            reference_file: DEFAULT_REFERENCE_FILE.to_string(),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            reference_sample_size: DEFAULT_SAMPLE_SIZE,
            seed: DEFAULT_SEED,
            explainer_nsamples: None,
            require_manifest: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ScreeningError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ScreeningError::Validation(format!("{name} must be a number, got '{value}'")))
}

impl ScreeningConfig {
    /// Build a config from the process environment.
    ///
    /// # Errors
    /// Returns `Validation` if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ScreeningError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `Validation` if a numeric variable cannot be parsed or a
    /// sample size of zero is requested.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreeningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ARTIFACT_DIR_ENV) {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup(MODEL_FILE_ENV) {
            config.model_file = v;
        }
        if let Some(v) = lookup(SCALER_FILE_ENV) {
            config.scaler_file = v;
        }
        if let Some(v) = lookup(REFERENCE_FILE_ENV) {
            config.reference_file = v;
        }
        if let Some(v) = lookup(TARGET_COLUMN_ENV) {
            config.target_column = v;
        }
        if let Some(v) = lookup(SAMPLE_SIZE_ENV) {
            config.reference_sample_size = parse_number(SAMPLE_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(SEED_ENV) {
            config.seed = parse_number(SEED_ENV, &v)?;
        }
        if let Some(v) = lookup(NSAMPLES_ENV) {
            config.explainer_nsamples = Some(parse_number(NSAMPLES_ENV, &v)?);
        }
        if let Some(v) = lookup(REQUIRE_MANIFEST_ENV) {
            config.require_manifest = parse_bool(&v);
        }

        if config.reference_sample_size == 0 {
            return Err(ScreeningError::Validation(format!(
                "{SAMPLE_SIZE_ENV} must be at least 1"
            )));
        }
        if config.explainer_nsamples == Some(0) {
            return Err(ScreeningError::Validation(format!(
                "{NSAMPLES_ENV} must be at least 1"
            )));
        }

        Ok(config)
    }

    /// Point the config at another artifact directory.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.artifact_dir = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    #[must_use]
    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler_file)
    }

    #[must_use]
    pub fn reference_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.reference_file)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.artifact_dir.join("manifest.json")
    }
}
