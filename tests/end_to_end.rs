//! End-to-end screening against the bundled demo artifacts in `models/`.

use std::path::PathBuf;

use heartscreen::adapters::{ArtifactSet, CsvReferenceSource};
use heartscreen::application::pipeline;
use heartscreen::application::ArtifactScreeningService;
use heartscreen::config::ScreeningConfig;
use heartscreen::domain::{
    encode, ChestPainType, ClinicalInput, ExplanationOutcome, RestingEcg, Sex, StSlope,
    FEATURE_NAMES, SCALED_FEATURES,
};
use heartscreen::ports::{Classifier, ReferenceSource};
use heartscreen::{RiskLabel, ScreeningError};

fn demo_config() -> ScreeningConfig {
    ScreeningConfig::default()
        .with_artifact_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models"))
}

fn scenario_a() -> ClinicalInput {
    ClinicalInput {
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

fn high_risk_patient() -> ClinicalInput {
    ClinicalInput {
        age: 67,
        cholesterol: 0,
        fasting_bs_high: true,
        resting_ecg: RestingEcg::StAbnormality,
        max_hr: 108,
        exercise_angina: true,
        oldpeak: 2.4,
        st_slope: StSlope::Flat,
        ..scenario_a()
    }
}

#[test]
fn scenario_a_encodes_to_expected_vector() {
    let features = encode(&scenario_a());
    assert_eq!(
        features.to_array(),
        [50.0, 120.0, 200.0, 0.0, 150.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn scenario_b_imputes_missing_cholesterol() {
    let a = encode(&scenario_a()).to_array();
    let b = encode(&ClinicalInput {
        cholesterol: 0,
        ..scenario_a()
    })
    .to_array();

    assert_eq!(b[2], 237.0);
    assert_eq!(b[14], 1.0);
    for j in (0..FEATURE_NAMES.len()).filter(|&j| j != 2 && j != 14) {
        assert_eq!(a[j], b[j], "slot {} changed", FEATURE_NAMES[j]);
    }
}

#[test]
fn scaling_changes_only_continuous_slots() {
    let artifacts = ArtifactSet::load(&demo_config()).expect("demo artifacts");
    let features = encode(&high_risk_patient());
    let scaled = pipeline::scale(&features, artifacts.scaler.as_ref()).expect("scale");

    for (j, (name, (before, after))) in FEATURE_NAMES
        .iter()
        .zip(features.to_array().into_iter().zip(scaled.to_array()))
        .enumerate()
    {
        if SCALED_FEATURES.contains(name) {
            assert_ne!(before, after, "slot {j} ({name}) should be scaled");
        } else {
            assert_eq!(before.to_bits(), after.to_bits(), "slot {j} ({name}) changed");
        }
    }
}

#[test]
fn demo_manifest_verifies() {
    let config = ScreeningConfig {
        require_manifest: true,
        ..demo_config()
    };
    let artifacts = ArtifactSet::load(&config).expect("manifest must match demo artifacts");
    assert!(artifacts.verified);
    assert_eq!(artifacts.classifier.n_features(), FEATURE_NAMES.len());
}

#[test]
fn full_screening_is_additive_and_consistent() {
    let service = ArtifactScreeningService::from_config(&demo_config()).expect("service");

    for input in [scenario_a(), high_risk_patient()] {
        let report = service.screen(&input).expect("screen");
        let prediction = report.prediction;
        assert!((0.0..=1.0).contains(&prediction.probability));
        // Logistic decision and probability agree at the boundary.
        assert_eq!(
            prediction.label == RiskLabel::HighRisk,
            prediction.probability > 0.5
        );

        let attribution = report
            .explanation
            .attribution()
            .expect("attribution available with demo artifacts");
        assert!(attribution.additivity_gap() < 1e-6);
        assert!((attribution.model_output - prediction.probability).abs() < 1e-12);
        assert_eq!(attribution.contributions.len(), FEATURE_NAMES.len());
    }

    let high = service.screen(&high_risk_patient()).unwrap();
    assert_eq!(high.prediction.label, RiskLabel::HighRisk);
}

#[test]
fn explanations_are_reproducible_across_processes() {
    let first = ArtifactScreeningService::from_config(&demo_config())
        .unwrap()
        .screen(&high_risk_patient())
        .unwrap();
    let second = ArtifactScreeningService::from_config(&demo_config())
        .unwrap()
        .screen(&high_risk_patient())
        .unwrap();
    assert_eq!(first.explanation, second.explanation);
}

#[test]
fn reference_loader_is_deterministic() {
    let source = CsvReferenceSource::from_config(&demo_config());
    let a = source.load().expect("reference");
    let b = source.load().expect("reference");
    assert_eq!(a.len(), 50);
    assert_eq!(a, b);
    for (x, y) in a.rows().iter().zip(b.rows()) {
        for (u, v) in x.to_array().iter().zip(y.to_array()) {
            assert_eq!(u.to_bits(), v.to_bits());
        }
    }
}

#[test]
fn missing_reference_keeps_prediction() {
    let config = ScreeningConfig {
        reference_file: "does_not_exist.csv".to_string(),
        ..demo_config()
    };
    let service = ArtifactScreeningService::from_config(&config).expect("service");
    let report = service.screen(&scenario_a()).expect("prediction must survive");

    assert!(matches!(
        report.explanation,
        ExplanationOutcome::Unavailable { .. }
    ));
    let baseline = service.predict_only(&scenario_a()).unwrap();
    assert_eq!(report.prediction, baseline.prediction);
}

#[test]
fn missing_model_is_fatal() {
    let config = ScreeningConfig {
        model_file: "missing.json".to_string(),
        ..demo_config()
    };
    assert!(matches!(
        ArtifactScreeningService::from_config(&config),
        Err(ScreeningError::ArtifactLoad { .. })
    ));
}
