//! Kernel SHAP adapter: Model-agnostic attribution over a reference sample.
//!
//! Explains the positive-class probability of one instance. Features are
//! switched between the instance value and background values according to
//! coalition masks; the expected model output for each coalition is regressed
//! on the masks with Shapley kernel weights.
//!
//! # Coalition budget
//!
//! With `M` varying features there are `2^M - 2` proper coalitions. If the
//! budget (`2M + 2048` by default) covers them all, they are enumerated and the
//! result is the exact Shapley value of the interventional game. Otherwise
//! coalition sizes are enumerated smallest-first (with their complements)
//! while the budget allows, and the remaining mass is sampled from the kernel
//! distribution with a seeded ChaCha RNG.
//!
//! # Additivity
//!
//! The regression is constrained by eliminating the last varying feature, so
//! `base_value + sum(contributions) == model_output` up to rounding.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::ScreeningConfig;
use crate::domain::{AttributionResult, FeatureVector, ReferenceSample, FEATURE_COUNT};
use crate::ports::{AttributionEngine, Classifier};
use crate::ScreeningError;

/// Extra coalitions on top of `2M` in the default budget.
const DEFAULT_EXTRA_SAMPLES: usize = 2048;

/// Singular values below this are treated as zero in the solve.
const SVD_EPS: f64 = 1e-12;

fn unavailable(reason: impl std::fmt::Display) -> ScreeningError {
    ScreeningError::ExplainerUnavailable(reason.to_string())
}

/// `numpy.isclose(a, b)` with default tolerances. The relative term scales with `b`.
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn bit(mask: u32, k: usize) -> f64 {
    if mask & (1 << k) != 0 {
        1.0
    } else {
        0.0
    }
}

/// Deduplicated coalition masks with accumulated weights.
#[derive(Debug, Default)]
struct Coalitions {
    masks: Vec<u32>,
    weights: Vec<f64>,
    index: HashMap<u32, usize>,
}

impl Coalitions {
    /// Add a mask, or bump its weight if already present. Returns whether it was new.
    fn add(&mut self, mask: u32, weight: f64) -> bool {
        if let Some(&i) = self.index.get(&mask) {
            self.weights[i] += weight;
            false
        } else {
            self.index.insert(mask, self.masks.len());
            self.masks.push(mask);
            self.weights.push(weight);
            true
        }
    }

    fn len(&self) -> usize {
        self.masks.len()
    }
}

/// Choose coalitions over `m` players within `nsamples`.
fn build_coalitions(m: usize, nsamples: usize, rng: &mut ChaCha8Rng) -> Coalitions {
    let full: u32 = (1u32 << m) - 1;
    let max_samples = (1usize << m) - 2;
    let nsamples = nsamples.min(max_samples);

    let num_subset_sizes = m / 2;
    let num_paired = (m - 1) / 2;

    let mut weight_vector: Vec<f64> = (1..=num_subset_sizes)
        .map(|s| (m - 1) as f64 / (s * (m - s)) as f64)
        .collect();
    for w in weight_vector.iter_mut().take(num_paired) {
        *w *= 2.0;
    }
    let total: f64 = weight_vector.iter().sum();
    for w in &mut weight_vector {
        *w /= total;
    }

    let mut coalitions = Coalitions::default();
    let mut remaining = weight_vector.clone();
    let mut samples_left = nsamples;
    let mut num_full = 0;

    for size in 1..=num_subset_sizes {
        let paired = size <= num_paired;
        let mut nsubsets = binomial(m, size);
        if paired {
            nsubsets *= 2.0;
        }
        if (samples_left as f64) * remaining[size - 1] / nsubsets < 1.0 - 1e-8 {
            break;
        }

        num_full += 1;
        samples_left = samples_left.saturating_sub(nsubsets as usize);
        if remaining[size - 1] < 1.0 {
            let denom = 1.0 - remaining[size - 1];
            for r in &mut remaining {
                *r /= denom;
            }
        }

        let mut w = weight_vector[size - 1] / binomial(m, size);
        if paired {
            w /= 2.0;
        }
        for mask in (1..full).filter(|mask: &u32| mask.count_ones() as usize == size) {
            coalitions.add(mask, w);
            if paired {
                coalitions.add(!mask & full, w);
            }
        }
    }

    let nfixed = coalitions.len();
    if num_full == num_subset_sizes || samples_left == 0 {
        return coalitions;
    }

    // Sample the rest from the kernel over the sizes not enumerated.
    let mut draw_weights = weight_vector.clone();
    for w in draw_weights.iter_mut().take(num_paired) {
        *w /= 2.0;
    }
    let draw_weights = &draw_weights[num_full..];
    let Ok(size_dist) = WeightedIndex::new(draw_weights) else {
        return coalitions;
    };

    let max_draws = 4 * samples_left;
    let mut draws = 0;
    while samples_left > 0 && draws < max_draws {
        draws += 1;
        let size = size_dist.sample(rng) + num_full + 1;
        let mask = rand::seq::index::sample(rng, m, size)
            .into_iter()
            .fold(0u32, |acc, k| acc | (1 << k));

        if coalitions.add(mask, 1.0) {
            samples_left -= 1;
        }
        if samples_left > 0 && size <= num_paired && coalitions.add(!mask & full, 1.0) {
            samples_left -= 1;
        }
    }

    // Rescale sampled weights to the kernel mass left after enumeration.
    let weight_left: f64 = weight_vector[num_full..].iter().sum();
    let sampled: f64 = coalitions.weights[nfixed..].iter().sum();
    if sampled > 0.0 {
        for w in &mut coalitions.weights[nfixed..] {
            *w *= weight_left / sampled;
        }
    }

    coalitions
}

/// Sampling Kernel SHAP over the positive-class probability.
#[derive(Debug, Clone)]
pub struct KernelExplainer {
    nsamples: Option<usize>,
    seed: u64,
}

impl KernelExplainer {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            nsamples: None,
            seed,
        }
    }

    /// Fix the coalition budget instead of `2M + 2048`.
    #[must_use]
    pub fn with_nsamples(mut self, nsamples: usize) -> Self {
        self.nsamples = Some(nsamples);
        self
    }

    #[must_use]
    pub fn from_config(config: &ScreeningConfig) -> Self {
        Self {
            nsamples: config.explainer_nsamples,
            seed: config.seed,
        }
    }

    /// Mean positive-class probability over background rows with the
    /// coalition's features taken from `x`.
    fn coalition_value(
        model: &dyn Classifier,
        x: &[f64; FEATURE_COUNT],
        background: &[[f64; FEATURE_COUNT]],
        varying: &[usize],
        mask: u32,
    ) -> Result<f64, ScreeningError> {
        let mut total = 0.0;
        for row in background {
            let mut synth = *row;
            for (k, &j) in varying.iter().enumerate() {
                if mask & (1 << k) != 0 {
                    synth[j] = x[j];
                }
            }
            total += model.predict_proba(&synth)?[1];
        }
        Ok(total / background.len() as f64)
    }

    fn solve(
        coalitions: &Coalitions,
        values: &[f64],
        base: f64,
        output: f64,
        m: usize,
    ) -> Result<Vec<f64>, ScreeningError> {
        let last = m - 1;
        let gap = output - base;
        let n = coalitions.len();
        if n == 0 {
            return Err(unavailable("no coalitions within budget"));
        }
        let sqrt_w: Vec<f64> = coalitions.weights.iter().map(|w| w.sqrt()).collect();

        let a = DMatrix::from_fn(n, last, |i, k| {
            let mask = coalitions.masks[i];
            (bit(mask, k) - bit(mask, last)) * sqrt_w[i]
        });
        let b = DVector::from_fn(n, |i, _| {
            (values[i] - base - bit(coalitions.masks[i], last) * gap) * sqrt_w[i]
        });

        let phi = a
            .svd(true, true)
            .solve(&b, SVD_EPS)
            .map_err(|e| unavailable(format!("least-squares solve failed: {e}")))?;

        let mut out: Vec<f64> = phi.iter().copied().collect();
        let head: f64 = out.iter().sum();
        out.push(gap - head);
        Ok(out)
    }
}

impl AttributionEngine for KernelExplainer {
    fn attribute(
        &self,
        instance: &FeatureVector,
        model: &dyn Classifier,
        reference: &ReferenceSample,
    ) -> Result<AttributionResult, ScreeningError> {
        if reference.is_empty() {
            return Err(unavailable("reference sample is empty"));
        }
        if model.n_features() != FEATURE_COUNT {
            return Err(unavailable(format!(
                "model expects {} features, explainer provides {FEATURE_COUNT}",
                model.n_features()
            )));
        }

        let x = instance.to_array();
        let background: Vec<[f64; FEATURE_COUNT]> =
            reference.rows().iter().map(FeatureVector::to_array).collect();

        let output = model.predict_proba(&x).map_err(unavailable)?[1];
        let mut base = 0.0;
        for row in &background {
            base += model.predict_proba(row).map_err(unavailable)?[1];
        }
        base /= background.len() as f64;

        let varying: Vec<usize> = (0..FEATURE_COUNT)
            .filter(|&j| background.iter().any(|row| !is_close(x[j], row[j])))
            .collect();
        let m = varying.len();

        let mut contributions = [0.0; FEATURE_COUNT];
        match m {
            0 => {}
            1 => contributions[varying[0]] = output - base,
            _ => {
                let budget = self
                    .nsamples
                    .unwrap_or(2 * m + DEFAULT_EXTRA_SAMPLES);
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                let coalitions = build_coalitions(m, budget, &mut rng);

                let values = coalitions
                    .masks
                    .iter()
                    .map(|&mask| Self::coalition_value(model, &x, &background, &varying, mask))
                    .collect::<Result<Vec<f64>, _>>()
                    .map_err(unavailable)?;

                let phi = Self::solve(&coalitions, &values, base, output, m)?;
                for (&j, v) in varying.iter().zip(phi) {
                    contributions[j] = v;
                }
                tracing::debug!(
                    "Kernel SHAP: {} varying features, {} coalitions",
                    m,
                    coalitions.len()
                );
            }
        }

        if contributions.iter().any(|c| !c.is_finite()) {
            return Err(unavailable("non-finite attribution"));
        }

        Ok(AttributionResult::new(base, output, instance, &contributions))
    }
}
