//! Heartscreen: Cardiac risk screening
//!
//! Main entry point for the command-line front end.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartscreen::adapters::sanitize::SanitizingMakeWriter;
use heartscreen::adapters::{ArtifactSet, CsvReferenceSource};
use heartscreen::application::{render_json, render_text, ArtifactScreeningService};
use heartscreen::config::ScreeningConfig;
use heartscreen::domain::{encode, ClinicalInput};
use heartscreen::ports::{Classifier, FeatureScaler, ReferenceSource};

use cli::{AssessArgs, Cli, Commands, PatientArgs};

fn main() -> Result<()> {
    // Logs go to stderr by default so stdout carries only the report.
    let log_mode = std::env::var("HEARTSCREEN_LOG_MODE").unwrap_or_else(|_| "stderr".to_string());

    let (writer, _guard) = if log_mode == "file" {
        let log_file = std::env::var("HEARTSCREEN_LOG_FILE")
            .unwrap_or_else(|_| "heartscreen.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ScreeningConfig::from_env().context("reading HEARTSCREEN_* settings")?;
    if let Some(dir) = &cli.artifacts {
        config = config.with_artifact_dir(dir);
    }

    match cli.command {
        Commands::Assess(args) => assess(&config, &args),
        Commands::Encode(args) => encode_only(&args),
        Commands::CheckArtifacts => check_artifacts(&config),
    }
}

fn validated(args: &PatientArgs) -> Result<ClinicalInput> {
    let input = ClinicalInput::from(args);
    if let Err(errors) = input.validate() {
        anyhow::bail!("invalid input:\n  {}", errors.join("\n  "));
    }
    Ok(input)
}

fn assess(config: &ScreeningConfig, args: &AssessArgs) -> Result<()> {
    let input = validated(&args.patient)?;
    let service = ArtifactScreeningService::from_config(config)
        .context("loading screening artifacts")?;

    let report = if args.no_explain {
        service.predict_only(&input)?
    } else {
        service.screen(&input)?
    };

    if args.json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_text(&report, args.max_display));
    }
    Ok(())
}

fn encode_only(args: &PatientArgs) -> Result<()> {
    let input = validated(args)?;
    for (name, value) in encode(&input).named() {
        println!("{name:<24} {value}");
    }
    Ok(())
}

fn check_artifacts(config: &ScreeningConfig) -> Result<()> {
    let artifacts = ArtifactSet::load(config).context("loading classifier and scaler")?;
    let reference = CsvReferenceSource::from_config(config)
        .load()
        .context("loading reference sample")?;

    println!("Artifact directory: {}", config.artifact_dir.display());
    println!(
        "Manifest:           {}",
        if artifacts.verified {
            "verified"
        } else {
            "absent"
        }
    );
    println!(
        "Classifier:         {} features",
        artifacts.classifier.n_features()
    );
    for (i, name) in artifacts.classifier.feature_names().iter().enumerate() {
        println!("  {i:>2}  {name}");
    }
    println!(
        "Scaler:             {}",
        artifacts.scaler.feature_names().join(", ")
    );
    println!(
        "Reference sample:   {} rows (seed {})",
        reference.len(),
        config.seed
    );
    Ok(())
}
