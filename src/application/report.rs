//! Report rendering for terminals and machine consumers.

use std::fmt::Write as _;

use crate::domain::{ExplanationOutcome, ScreeningReport, WaterfallRow};
use crate::ScreeningError;

/// Width of the longest waterfall bar, in characters.
const BAR_WIDTH: usize = 24;

fn bar(contribution: f64, largest: f64) -> String {
    if largest <= 0.0 {
        return String::new();
    }
    let len = ((contribution.abs() / largest) * BAR_WIDTH as f64).round() as usize;
    let glyph = if contribution >= 0.0 { '+' } else { '-' };
    std::iter::repeat(glyph).take(len).collect()
}

fn row_label(row: &WaterfallRow) -> String {
    match row.feature_value {
        Some(v) => format!("{} = {v:.3}", row.label),
        None => row.label.clone(),
    }
}

/// Plain-text report: verdict, confidence and a text waterfall.
#[must_use]
pub fn render_text(report: &ScreeningReport, max_display: usize) -> String {
    let mut out = String::new();
    let prediction = &report.prediction;

    let _ = writeln!(out, "Result:     {}", prediction.label);
    let _ = writeln!(out, "            {}", prediction.label.description());
    let _ = writeln!(out, "Confidence: {:.1}%", prediction.confidence() * 100.0);
    let _ = writeln!(out, "P(disease): {:.4}", prediction.probability);
    let _ = writeln!(out);

    match &report.explanation {
        ExplanationOutcome::Available(attribution) => {
            let rows = attribution.ranked(max_display);
            let labels: Vec<String> = rows.iter().map(row_label).collect();
            let width = labels
                .iter()
                .map(String::len)
                .max()
                .unwrap_or(0)
                .max("E[f(x)]".len());
            let largest = rows
                .iter()
                .map(|r| r.contribution.abs())
                .fold(0.0, f64::max);

            let _ = writeln!(out, "Feature attribution (positive-class probability):");
            let _ = writeln!(out, "  {:<width$}  {:>8.4}", "E[f(x)]", attribution.base_value);
            for (row, label) in rows.iter().zip(&labels) {
                let _ = writeln!(
                    out,
                    "  {label:<width$}  {:>+8.4}  {}",
                    row.contribution,
                    bar(row.contribution, largest)
                );
            }
            let _ = writeln!(out, "  {:<width$}  {:>8.4}", "f(x)", attribution.model_output);
        }
        ExplanationOutcome::Unavailable { reason } => {
            let _ = writeln!(out, "Feature attribution unavailable: {reason}");
        }
        ExplanationOutcome::Skipped => {}
    }

    out
}

/// The whole report as pretty-printed JSON.
///
/// # Errors
/// Returns `Serialization` if encoding fails.
pub fn render_json(report: &ScreeningReport) -> Result<String, ScreeningError> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        encode, AttributionResult, ClinicalInput, PredictionResult, RiskLabel, FEATURE_COUNT,
    };

    fn report(explanation: ExplanationOutcome) -> ScreeningReport {
        let features = encode(&ClinicalInput::default());
        ScreeningReport {
            features,
            scaled: features,
            prediction: PredictionResult::new(RiskLabel::HighRisk, 0.873),
            explanation,
            created_at: chrono::Utc::now(),
        }
    }

    fn attribution() -> AttributionResult {
        let features = encode(&ClinicalInput::default());
        let mut values = [0.0; FEATURE_COUNT];
        values[5] = 0.3;
        values[11] = 0.2;
        values[4] = -0.1;
        AttributionResult::new(0.473, 0.873, &features, &values)
    }

    #[test]
    fn test_text_report_with_waterfall() {
        let text = render_text(&report(ExplanationOutcome::Available(attribution())), 4);
        assert!(text.contains("HIGH RISK"));
        assert!(text.contains("Confidence: 87.3%"));
        assert!(text.contains("E[f(x)]"));
        assert!(text.contains("oldpeak = 0.000"));
        assert!(text.contains("+0.3000"));
        assert!(text.contains("-0.1000"));
        assert!(text.contains("12 other features"));

        let oldpeak = text.find("oldpeak").unwrap();
        let slope = text.find("st_slope_encoded").unwrap();
        let maxhr = text.find("maxhr").unwrap();
        assert!(oldpeak < slope && slope < maxhr);
    }

    #[test]
    fn test_text_report_when_unavailable() {
        let text = render_text(
            &report(ExplanationOutcome::Unavailable {
                reason: "reference table missing".into(),
            }),
            10,
        );
        assert!(text.contains("HIGH RISK"));
        assert!(text.contains("Feature attribution unavailable: reference table missing"));
    }

    #[test]
    fn test_json_report_shape() {
        let json = render_json(&report(ExplanationOutcome::Available(attribution()))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["prediction"]["label"], "high_risk");
        assert_eq!(value["explanation"]["status"], "available");
        assert_eq!(value["features"]["Cholesterol_missing"], 0.0);
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn test_bar_scales_with_contribution() {
        assert_eq!(bar(0.5, 0.5).len(), BAR_WIDTH);
        assert!(bar(-0.25, 0.5).starts_with('-'));
        assert_eq!(bar(0.0, 0.0), "");
    }
}
