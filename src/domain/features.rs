//! The model's feature vector and the encoder that builds it.
//!
//! Slot order is a positional contract with the trained classifier and the
//! fitted scaler. `FeatureVector` names every slot so that any table or
//! artifact declaring a different order is rejected when the vector is built,
//! instead of producing a valid-looking but wrong prediction.

use serde::{Deserialize, Serialize};

use crate::domain::patient::ClinicalInput;
use crate::ScreeningError;

/// Number of slots in the model's input.
pub const FEATURE_COUNT: usize = 15;

/// Number of continuous slots handled by the scaler.
pub const SCALED_COUNT: usize = 5;

/// Feature names in training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "restingbp",
    "cholesterol",
    "fastingbs",
    "maxhr",
    "oldpeak",
    "sex_encoded",
    "cp_ATA",
    "cp_NAP",
    "cp_TA",
    "exerciseangina_encoded",
    "st_slope_encoded",
    "ecg_ST",
    "ecg_LVH",
    "Cholesterol_missing",
];

/// Continuous features, in the order the scaler was fitted on.
pub const SCALED_FEATURES: [&str; SCALED_COUNT] =
    ["age", "restingbp", "cholesterol", "maxhr", "oldpeak"];

/// Training-set mean used in place of an unmeasured (zero) cholesterol reading.
pub const CHOLESTEROL_IMPUTATION: f64 = 237.0;

/// Encoded model input, one named field per slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub age: f64,
    pub restingbp: f64,
    pub cholesterol: f64,
    pub fastingbs: f64,
    pub maxhr: f64,
    pub oldpeak: f64,
    pub sex_encoded: f64,
    #[serde(rename = "cp_ATA")]
    pub cp_ata: f64,
    #[serde(rename = "cp_NAP")]
    pub cp_nap: f64,
    #[serde(rename = "cp_TA")]
    pub cp_ta: f64,
    pub exerciseangina_encoded: f64,
    pub st_slope_encoded: f64,
    #[serde(rename = "ecg_ST")]
    pub ecg_st: f64,
    #[serde(rename = "ecg_LVH")]
    pub ecg_lvh: f64,
    #[serde(rename = "Cholesterol_missing")]
    pub cholesterol_missing: f64,
}

impl FeatureVector {
    /// Slots in training order (see `FEATURE_NAMES`).
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.restingbp,
            self.cholesterol,
            self.fastingbs,
            self.maxhr,
            self.oldpeak,
            self.sex_encoded,
            self.cp_ata,
            self.cp_nap,
            self.cp_ta,
            self.exerciseangina_encoded,
            self.st_slope_encoded,
            self.ecg_st,
            self.ecg_lvh,
            self.cholesterol_missing,
        ]
    }

    /// Inverse of `to_array`.
    #[must_use]
    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            age: v[0],
            restingbp: v[1],
            cholesterol: v[2],
            fastingbs: v[3],
            maxhr: v[4],
            oldpeak: v[5],
            sex_encoded: v[6],
            cp_ata: v[7],
            cp_nap: v[8],
            cp_ta: v[9],
            exerciseangina_encoded: v[10],
            st_slope_encoded: v[11],
            ecg_st: v[12],
            ecg_lvh: v[13],
            cholesterol_missing: v[14],
        }
    }

    /// Build a vector from externally ordered columns.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` unless `names` is exactly `FEATURE_NAMES`
    /// (same names, same order) and `values` has one entry per name.
    pub fn from_named<S: AsRef<str>>(names: &[S], values: &[f64]) -> Result<Self, ScreeningError> {
        check_schema(names, &FEATURE_NAMES)?;
        let array: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            ScreeningError::SchemaMismatch(format!(
                "Expected {FEATURE_COUNT} values, got {}",
                values.len()
            ))
        })?;
        Ok(Self::from_array(array))
    }

    /// `(name, value)` pairs in training order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }

    /// The continuous subvector, in `SCALED_FEATURES` order.
    #[must_use]
    pub fn scaled_slice(&self) -> [f64; SCALED_COUNT] {
        [
            self.age,
            self.restingbp,
            self.cholesterol,
            self.maxhr,
            self.oldpeak,
        ]
    }

    /// Replace the continuous subvector, leaving every other slot untouched.
    #[must_use]
    pub fn with_scaled_slice(self, scaled: [f64; SCALED_COUNT]) -> Self {
        Self {
            age: scaled[0],
            restingbp: scaled[1],
            cholesterol: scaled[2],
            maxhr: scaled[3],
            oldpeak: scaled[4],
            ..self
        }
    }
}

/// Check that a declared column order matches an expected one exactly.
///
/// # Errors
/// Returns `SchemaMismatch` naming the first differing position.
pub(crate) fn check_schema<S: AsRef<str>>(
    actual: &[S],
    expected: &[&str],
) -> Result<(), ScreeningError> {
    if actual.len() != expected.len() {
        return Err(ScreeningError::SchemaMismatch(format!(
            "Expected {} features, got {}",
            expected.len(),
            actual.len()
        )));
    }
    for (idx, (got, want)) in actual.iter().zip(expected).enumerate() {
        if got.as_ref() != *want {
            return Err(ScreeningError::SchemaMismatch(format!(
                "Feature {idx} is '{}', expected '{want}'",
                got.as_ref()
            )));
        }
    }
    Ok(())
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Encode a clinical record into the model's feature vector.
///
/// Pure and total over the typed input: no I/O, no failure path.
#[must_use]
pub fn encode(input: &ClinicalInput) -> FeatureVector {
    let (cholesterol, cholesterol_missing) = if input.cholesterol == 0 {
        (CHOLESTEROL_IMPUTATION, 1.0)
    } else {
        (f64::from(input.cholesterol), 0.0)
    };
    let [cp_ata, cp_nap, cp_ta] = input.chest_pain_type.indicators();
    let [ecg_st, ecg_lvh] = input.resting_ecg.indicators();

    FeatureVector {
        age: f64::from(input.age),
        restingbp: f64::from(input.resting_bp),
        cholesterol,
        fastingbs: flag(input.fasting_bs_high),
        maxhr: f64::from(input.max_hr),
        oldpeak: input.oldpeak,
        sex_encoded: flag(input.sex == crate::domain::Sex::Male),
        cp_ata,
        cp_nap,
        cp_ta,
        exerciseangina_encoded: flag(input.exercise_angina),
        st_slope_encoded: input.st_slope.code(),
        ecg_st,
        ecg_lvh,
        cholesterol_missing,
    }
}
