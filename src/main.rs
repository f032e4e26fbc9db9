//! Plant Leaf Disease Diagnosis CLI
//!
//! Diagnoses a single leaf photo from the command line, prints the
//! translated advisory and reads it aloud.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use plant_diagnosis::advisory::AdvisoryStatus;
use plant_diagnosis::inference::{LeafClassifier, OnnxClassifier};
use plant_diagnosis::notify::{CommandPlayer, GoogleSpeech, SpeechService};
use plant_diagnosis::pipeline::{DiagnosisReport, MessageKind};
use plant_diagnosis::utils::format_percent;
use plant_diagnosis::utils::logging::{init_logging, LogConfig};
use plant_diagnosis::{
    AdvisoryTable, AppConfig, ClassLabel, DiagnosisPipeline, Language, Narrator, UploadedImage,
};

/// Plant Leaf Disease Diagnosis
///
/// Classifies a leaf photo into one of ten plant/disease classes and gives
/// treatment and prevention advice in six languages.
#[derive(Parser, Debug)]
#[command(name = "plant_diagnosis")]
#[command(author = "Warre Snaet")]
#[command(version)]
#[command(about = "Plant leaf disease diagnosis with spoken advisories", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false")]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PLANT_DIAGNOSIS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "PLANT_DIAGNOSIS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the ONNX model (overrides the configuration)
    #[arg(short, long, env = "PLANT_DIAGNOSIS_MODEL")]
    model: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diagnose a leaf image
    Predict {
        /// Path to the leaf image
        #[arg(short, long)]
        image: PathBuf,

        /// Output language, by name or code (English, hi, Telugu, ...)
        #[arg(short, long, default_value = "English")]
        language: Language,

        /// Do not read the messages aloud
        #[arg(long, default_value = "false")]
        no_speech: bool,

        /// Print the full report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the class labels and advisory coverage
    Labels,

    /// Load the model and check that it accepts the expected input
    CheckModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_flags(cli.verbose, cli.quiet, cli.log_level.as_deref());
    let _ = init_logging(&log_config);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model.path = model;
    }

    match cli.command {
        Commands::Predict {
            image,
            language,
            no_speech,
            json,
        } => {
            cmd_predict(&config, &image, language, no_speech, json).await?;
        }
        Commands::Labels => {
            cmd_labels(&config)?;
        }
        Commands::CheckModel => {
            cmd_check_model(&config)?;
        }
    }

    Ok(())
}

fn load_classifier(config: &AppConfig) -> Result<OnnxClassifier> {
    info!("Loading model from {}", config.model.path.display());
    let classifier = OnnxClassifier::load(
        &config.model.path,
        config.ingest.image_size,
        config.model.top_k,
    )?;
    Ok(classifier)
}

async fn cmd_predict(
    config: &AppConfig,
    image: &Path,
    language: Language,
    no_speech: bool,
    json: bool,
) -> Result<()> {
    let bytes = std::fs::read(image)
        .with_context(|| format!("Failed to read image {}", image.display()))?;
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let classifier = load_classifier(config)?;

    let narrator = if no_speech || !config.speech.enabled {
        Narrator::Silent
    } else {
        let synthesizer = GoogleSpeech::new(&config.services, &config.speech)?;
        let player = CommandPlayer::from_config(&config.speech);
        Narrator::Blocking(Arc::new(SpeechService::new(
            Arc::new(synthesizer),
            Arc::new(player),
        )))
    };

    let pipeline = DiagnosisPipeline::from_config(config, Arc::new(classifier), narrator)?;

    if !json {
        println!("{}", "Plant Disease Detection".green().bold());
        println!("  📷 Image:    {}", image.display());
        println!("  🌐 Language: {}", language);
        println!("  🔊 Speech:   {}", pipeline.narrator().mode_name());
        println!();
    }

    let upload = UploadedImage::new(bytes).with_file_name(file_name);
    let report = pipeline.diagnose(Some(upload), language).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &DiagnosisReport) {
    let title = if report.diagnosis.healthy {
        report.title().green().bold()
    } else {
        report.title().red().bold()
    };
    println!("{}", title);

    let prediction = &report.prediction;
    println!(
        "  Predicted: {} ({}, margin {})",
        prediction.label.as_str().cyan(),
        format_percent(prediction.confidence),
        format_percent(prediction.margin)
    );
    if prediction.low_confidence {
        println!(
            "  {} low confidence, consider retaking the photo",
            "Note:".yellow()
        );
    }
    println!("  Time: {:.2}ms", prediction.inference_time_ms);

    if let Some(link) = &report.diagnosis.reference {
        println!("  {}: {}", link.text, link.url.underline());
    }
    println!();

    for block in &report.messages {
        let heading = match block.kind {
            MessageKind::Status => block.kind.heading().cyan().bold(),
            _ => block.kind.heading().yellow().bold(),
        };
        println!("{}", heading);
        if block.translated().is_some() {
            println!("  {}", block.display_text());
        } else {
            println!("  {}", block.display_text().red());
        }
        println!();
    }
}

fn cmd_labels(config: &AppConfig) -> Result<()> {
    let table = AdvisoryTable::load(config.advisory.table_path.as_deref())?;

    println!("{}", "Class Labels:".cyan().bold());
    for label in ClassLabel::ALL {
        let coverage = match table.diagnose(label).advisory {
            AdvisoryStatus::Healthy => "healthy".green(),
            AdvisoryStatus::Available(_) => "advisory".normal(),
            AdvisoryStatus::Unavailable { .. } => "no advisory".red(),
        };
        println!(
            "  {:>2}. {:24} {:8} {:16} {}",
            label.index(),
            label.as_str(),
            label.plant_type(),
            label.disease(),
            coverage
        );
    }
    println!();

    println!("{}", "Languages:".cyan().bold());
    for language in Language::ALL {
        println!("  {:10} {}", language.display_name(), language.code());
    }

    let uncovered = table.uncovered_labels();
    if !uncovered.is_empty() {
        println!();
        println!(
            "{} {} diseased label(s) have no advisory",
            "Warning:".yellow(),
            uncovered.len()
        );
    }

    Ok(())
}

fn cmd_check_model(config: &AppConfig) -> Result<()> {
    println!("{}", "Model Check:".cyan().bold());
    println!("  🧠 Model: {}", config.model.path.display());
    println!(
        "  📐 Input: 1x{}x{}x3",
        config.ingest.image_size, config.ingest.image_size
    );

    match load_classifier(config) {
        Ok(classifier) => {
            println!("  {} {}", "OK".green().bold(), classifier.describe());
            Ok(())
        }
        Err(e) => {
            println!("  {} {}", "Error:".red(), e);
            Err(e)
        }
    }
}
