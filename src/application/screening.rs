//! Screening service: Orchestrates one screening cycle.
//!
//! This service coordinates:
//! - Input validation and encoding
//! - Scaling and prediction (failures abort the cycle)
//! - Attribution against the cached reference sample (failures are recorded
//!   in the report, the prediction stands)

use std::sync::Arc;

use crate::adapters::{
    ArtifactSet, CsvReferenceSource, KernelExplainer, LogisticRegression, ReferenceCache,
    ScalerArtifact,
};
use crate::application::pipeline;
use crate::config::ScreeningConfig;
use crate::domain::{
    encode, ClinicalInput, ExplanationOutcome, FeatureVector, PredictionResult, ReferenceSample,
    ScreeningReport,
};
use crate::ports::{AttributionEngine, Classifier, FeatureScaler, ReferenceSource};
use crate::ScreeningError;

/// Service for running screening cycles over loaded artifacts.
///
/// Collaborators are shared behind `Arc`, so one service can serve
/// concurrent requests. The reference sample is loaded on first use and
/// reused for the lifetime of the cache.
pub struct ScreeningService<C, S, E, R>
where
    C: Classifier,
    S: FeatureScaler,
    E: AttributionEngine,
    R: ReferenceSource,
{
    classifier: Arc<C>,
    scaler: Arc<S>,
    engine: Arc<E>,
    source: Arc<R>,
    cache: Arc<ReferenceCache>,
}

/// The service wired to the on-disk artifacts.
pub type ArtifactScreeningService =
    ScreeningService<LogisticRegression, ScalerArtifact, KernelExplainer, CsvReferenceSource>;

impl<C, S, E, R> ScreeningService<C, S, E, R>
where
    C: Classifier,
    S: FeatureScaler,
    E: AttributionEngine,
    R: ReferenceSource,
{
    /// Create a new screening service with its own reference cache.
    pub fn new(classifier: Arc<C>, scaler: Arc<S>, engine: Arc<E>, source: Arc<R>) -> Self {
        Self {
            classifier,
            scaler,
            engine,
            source,
            cache: Arc::new(ReferenceCache::new()),
        }
    }

    /// Share an existing reference cache.
    ///
    /// Services whose sources report the same cache key reuse one sample.
    /// Any other source still gets its own sample.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ReferenceCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The reference sample, loading and caching it on first call.
    ///
    /// # Errors
    /// Returns the loader's error; the next call retries.
    pub fn reference_sample(&self) -> Result<Arc<ReferenceSample>, ScreeningError> {
        self.cache.get_or_load(self.source.as_ref())
    }

    /// Validate, encode, scale and predict.
    fn score(
        &self,
        input: &ClinicalInput,
    ) -> Result<(FeatureVector, FeatureVector, PredictionResult), ScreeningError> {
        input
            .validate()
            .map_err(|errors| ScreeningError::Validation(errors.join("; ")))?;

        let features = encode(input);
        let scaled = pipeline::scale(&features, self.scaler.as_ref())?;
        tracing::debug!("Encoded and scaled input");

        let prediction = pipeline::predict(&scaled, self.classifier.as_ref())?;
        tracing::info!("Prediction complete: {}", prediction.label);

        Ok((features, scaled, prediction))
    }

    fn explain(&self, scaled: &FeatureVector) -> ExplanationOutcome {
        let result = self.reference_sample().and_then(|reference| {
            pipeline::explain(
                scaled,
                self.classifier.as_ref(),
                self.engine.as_ref(),
                &reference,
            )
        });

        match result {
            Ok(attribution) => {
                tracing::info!(
                    "Attribution complete (additivity gap {:.2e})",
                    attribution.additivity_gap()
                );
                ExplanationOutcome::Available(attribution)
            }
            Err(e) => {
                tracing::warn!("Attribution unavailable: {}", e);
                ExplanationOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Run a full screening cycle.
    ///
    /// # Errors
    /// Validation, schema and model errors abort the cycle. Attribution
    /// failures do not; they are reported in `ScreeningReport::explanation`.
    pub fn screen(&self, input: &ClinicalInput) -> Result<ScreeningReport, ScreeningError> {
        let (features, scaled, prediction) = self.score(input)?;
        let explanation = self.explain(&scaled);
        Ok(ScreeningReport {
            features,
            scaled,
            prediction,
            explanation,
            created_at: chrono::Utc::now(),
        })
    }

    /// Run a screening cycle without attribution.
    ///
    /// # Errors
    /// Same as [`Self::screen`] minus the attribution stage.
    pub fn predict_only(&self, input: &ClinicalInput) -> Result<ScreeningReport, ScreeningError> {
        let (features, scaled, prediction) = self.score(input)?;
        Ok(ScreeningReport {
            features,
            scaled,
            prediction,
            explanation: ExplanationOutcome::Skipped,
            created_at: chrono::Utc::now(),
        })
    }
}

impl ArtifactScreeningService {
    /// Load artifacts named by `config` and wire the default adapters.
    ///
    /// The reference table is not read until the first explanation.
    ///
    /// # Errors
    /// Any artifact load failure; no prediction is possible without them.
    pub fn from_config(config: &ScreeningConfig) -> Result<Self, ScreeningError> {
        let artifacts = ArtifactSet::load(config)?;
        tracing::info!(
            "Artifacts loaded from {:?} (manifest verified: {})",
            config.artifact_dir,
            artifacts.verified
        );
        Ok(Self::new(
            artifacts.classifier,
            artifacts.scaler,
            Arc::new(KernelExplainer::from_config(config)),
            Arc::new(CsvReferenceSource::from_config(config)),
        ))
    }
}
