use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use heartscreen::domain::{ChestPainType, ClinicalInput, RestingEcg, Sex, StSlope};
use heartscreen::domain::DEFAULT_MAX_DISPLAY;

#[derive(Debug, Parser)]
#[command(
    name = "heartscreen",
    version,
    about = "Cardiac risk screening over trained classifier artifacts"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Artifact directory (overrides HEARTSCREEN_ARTIFACT_DIR)"
    )]
    pub artifacts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score one patient and explain the result
    Assess(AssessArgs),
    /// Print the unscaled feature vector for one patient
    Encode(PatientArgs),
    /// Load and validate every artifact
    CheckArtifacts,
}

#[derive(Debug, Args)]
pub struct AssessArgs {
    #[command(flatten)]
    pub patient: PatientArgs,

    #[arg(long, default_value_t = false, help = "Print the report as JSON")]
    pub json: bool,

    #[arg(long, default_value_t = false, help = "Skip feature attribution")]
    pub no_explain: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_DISPLAY, help = "Waterfall rows to display")]
    pub max_display: usize,
}

/// Form fields, with the form's defaults.
#[derive(Debug, Args)]
pub struct PatientArgs {
    #[arg(long, default_value_t = 50, help = "Age in years (1-120)")]
    pub age: u32,

    #[arg(long, default_value = "male", help = "male|female")]
    pub sex: Sex,

    #[arg(
        long,
        default_value = "asymptomatic",
        help = "asymptomatic|atypical_angina|non_anginal|typical_angina"
    )]
    pub chest_pain: ChestPainType,

    #[arg(long, default_value_t = 120, help = "Resting blood pressure, mm Hg (0-250)")]
    pub resting_bp: u32,

    #[arg(long, default_value_t = 200, help = "Serum cholesterol, mg/dl (0 = not measured)")]
    pub cholesterol: u32,

    #[arg(long, default_value_t = false, help = "Fasting blood sugar > 120 mg/dl")]
    pub fasting_bs_high: bool,

    #[arg(long, default_value = "normal", help = "normal|st_abnormality|lvh")]
    pub resting_ecg: RestingEcg,

    #[arg(long, default_value_t = 150, help = "Maximum heart rate achieved (50-250)")]
    pub max_hr: u32,

    #[arg(long, default_value_t = false, help = "Exercise-induced angina")]
    pub exercise_angina: bool,

    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "ST depression induced by exercise (-5.0-10.0)"
    )]
    pub oldpeak: f64,

    #[arg(long, default_value = "up", help = "up|flat|down")]
    pub st_slope: StSlope,
}

impl From<&PatientArgs> for ClinicalInput {
    fn from(args: &PatientArgs) -> Self {
        Self {
            age: args.age,
            sex: args.sex,
            chest_pain_type: args.chest_pain,
            resting_bp: args.resting_bp,
            cholesterol: args.cholesterol,
            fasting_bs_high: args.fasting_bs_high,
            resting_ecg: args.resting_ecg,
            max_hr: args.max_hr,
            exercise_angina: args.exercise_angina,
            oldpeak: args.oldpeak,
            st_slope: args.st_slope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_form_defaults() {
        let cli = Cli::parse_from(["heartscreen", "assess"]);
        let Commands::Assess(args) = cli.command else {
            panic!("expected assess");
        };
        assert_eq!(ClinicalInput::from(&args.patient), ClinicalInput::default());
        assert!(!args.json);
        assert_eq!(args.max_display, DEFAULT_MAX_DISPLAY);
    }

    #[test]
    fn test_parses_labels_and_flags() {
        let cli = Cli::parse_from([
            "heartscreen",
            "--artifacts",
            "/tmp/models",
            "assess",
            "--sex",
            "Female",
            "--chest-pain",
            "atypical angina",
            "--resting-ecg",
            "lvh",
            "--st-slope",
            "Flat",
            "--oldpeak",
            "-1.5",
            "--exercise-angina",
            "--no-explain",
        ]);
        assert_eq!(cli.artifacts, Some(PathBuf::from("/tmp/models")));
        let Commands::Assess(args) = cli.command else {
            panic!("expected assess");
        };
        let input = ClinicalInput::from(&args.patient);
        assert_eq!(input.sex, Sex::Female);
        assert_eq!(input.chest_pain_type, ChestPainType::AtypicalAngina);
        assert_eq!(input.resting_ecg, RestingEcg::Lvh);
        assert_eq!(input.st_slope, StSlope::Flat);
        assert!((input.oldpeak + 1.5).abs() < 1e-12);
        assert!(input.exercise_angina);
        assert!(args.no_explain);
    }

    #[test]
    fn test_rejects_unknown_slope() {
        let result = Cli::try_parse_from(["heartscreen", "encode", "--st-slope", "sideways"]);
        assert!(result.is_err());
    }
}
