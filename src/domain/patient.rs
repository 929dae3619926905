//! Clinical input types for cardiac risk screening.
//!
//! One `ClinicalInput` is built per form submission and discarded after a
//! single prediction cycle; it is never persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ScreeningError;

/// Lowercase a user-facing label and fold spaces/dashes into underscores.
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn unknown_label(field: &str, label: &str) -> ScreeningError {
    ScreeningError::Validation(format!("Unrecognized {field} label '{label}'"))
}

/// Biological sex as recorded on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "m" | "male" => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            _ => Err(unknown_label("sex", s)),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
        }
    }
}

/// Chest pain type. `Asymptomatic` is the one-hot reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestPainType {
    #[default]
    Asymptomatic,
    AtypicalAngina,
    NonAnginal,
    TypicalAngina,
}

impl ChestPainType {
    /// Indicator slots `[cp_ATA, cp_NAP, cp_TA]`.
    #[must_use]
    pub fn indicators(self) -> [f64; 3] {
        match self {
            Self::Asymptomatic => [0.0, 0.0, 0.0],
            Self::AtypicalAngina => [1.0, 0.0, 0.0],
            Self::NonAnginal => [0.0, 1.0, 0.0],
            Self::TypicalAngina => [0.0, 0.0, 1.0],
        }
    }
}

impl FromStr for ChestPainType {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "asy" | "asymptomatic" => Ok(Self::Asymptomatic),
            "ata" | "atypical_angina" => Ok(Self::AtypicalAngina),
            "nap" | "non_anginal" | "non_anginal_pain" => Ok(Self::NonAnginal),
            "ta" | "typical_angina" => Ok(Self::TypicalAngina),
            _ => Err(unknown_label("chest pain type", s)),
        }
    }
}

impl fmt::Display for ChestPainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asymptomatic => write!(f, "ASY: Asymptomatic"),
            Self::AtypicalAngina => write!(f, "ATA: Atypical Angina"),
            Self::NonAnginal => write!(f, "NAP: Non-Anginal"),
            Self::TypicalAngina => write!(f, "TA: Typical Angina"),
        }
    }
}

/// Resting electrocardiogram result. `Normal` is the one-hot reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestingEcg {
    #[default]
    Normal,
    StAbnormality,
    Lvh,
}

impl RestingEcg {
    /// Indicator slots `[ecg_ST, ecg_LVH]`.
    #[must_use]
    pub fn indicators(self) -> [f64; 2] {
        match self {
            Self::Normal => [0.0, 0.0],
            Self::StAbnormality => [1.0, 0.0],
            Self::Lvh => [0.0, 1.0],
        }
    }
}

impl FromStr for RestingEcg {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "normal" => Ok(Self::Normal),
            "st" | "st_abnormality" | "st_t_abnormality" => Ok(Self::StAbnormality),
            "lvh" | "left_ventricular_hypertrophy" => Ok(Self::Lvh),
            _ => Err(unknown_label("resting ECG", s)),
        }
    }
}

impl fmt::Display for RestingEcg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::StAbnormality => write!(f, "ST: ST-T wave abnormality"),
            Self::Lvh => write!(f, "LVH: Left Ventricular Hypertrophy"),
        }
    }
}

/// Slope of the peak exercise ST segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StSlope {
    #[default]
    Up,
    Flat,
    Down,
}

impl StSlope {
    /// Ordinal code used by the model: Up = 0, Flat = 1, Down = 2.
    #[must_use]
    pub fn code(self) -> f64 {
        match self {
            Self::Up => 0.0,
            Self::Flat => 1.0,
            Self::Down => 2.0,
        }
    }
}

impl FromStr for StSlope {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "up" | "upsloping" => Ok(Self::Up),
            "flat" => Ok(Self::Flat),
            "down" | "downsloping" => Ok(Self::Down),
            _ => Err(unknown_label("ST slope", s)),
        }
    }
}

impl fmt::Display for StSlope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Flat => write!(f, "Flat"),
            Self::Down => write!(f, "Down"),
        }
    }
}

/// Raw, human-entered clinical record.
///
/// `Default` yields the screening form's initial values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInput {
    /// Age in years (1-120)
    pub age: u32,

    pub sex: Sex,

    pub chest_pain_type: ChestPainType,

    /// Resting blood pressure in mm Hg (0-250)
    pub resting_bp: u32,

    /// Serum cholesterol in mg/dl (0-700). Zero means "not measured".
    pub cholesterol: u32,

    /// Fasting blood sugar > 120 mg/dl
    pub fasting_bs_high: bool,

    pub resting_ecg: RestingEcg,

    /// Maximum heart rate achieved in bpm (50-250)
    pub max_hr: u32,

    /// Exercise-induced angina
    pub exercise_angina: bool,

    /// ST depression induced by exercise relative to rest (-5.0 to 10.0)
    pub oldpeak: f64,

    pub st_slope: StSlope,
}

impl Default for ClinicalInput {
    fn default() -> Self {
        Self {
            age: 50,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::Asymptomatic,
            resting_bp: 120,
            cholesterol: 200,
            fasting_bs_high: false,
            resting_ecg: RestingEcg::Normal,
            max_hr: 150,
            exercise_angina: false,
            oldpeak: 0.0,
            st_slope: StSlope::Up,
        }
    }
}

impl ClinicalInput {
    /// Validate that all numeric fields are within the form's ranges.
    ///
    /// # Errors
    /// Returns every violation found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(1..=120).contains(&self.age) {
            errors.push(format!("Age {} out of range [1, 120]", self.age));
        }
        if self.resting_bp > 250 {
            errors.push(format!(
                "Resting BP {} out of range [0, 250]",
                self.resting_bp
            ));
        }
        if self.cholesterol > 700 {
            errors.push(format!(
                "Cholesterol {} out of range [0, 700]",
                self.cholesterol
            ));
        }
        if !(50..=250).contains(&self.max_hr) {
            errors.push(format!("Max HR {} out of range [50, 250]", self.max_hr));
        }
        if !self.oldpeak.is_finite() || !(-5.0..=10.0).contains(&self.oldpeak) {
            errors.push(format!("Oldpeak {} out of range [-5.0, 10.0]", self.oldpeak));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
