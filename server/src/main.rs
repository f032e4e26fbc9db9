//! Plant Disease Detection Server
//!
//! Web front end for the diagnosis pipeline. Serves the upload page, renders
//! results, exposes the same pipeline as a JSON API and streams speech
//! playback events.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use plant_diagnosis::inference::{LeafClassifier, OnnxClassifier};
use plant_diagnosis::notify::{CommandPlayer, GoogleSpeech};
use plant_diagnosis::utils::logging::{init_logging, LogConfig};
use plant_diagnosis::{AppConfig, DiagnosisPipeline, Narrator, SpeechQueue, SpeechService};

use crate::state::AppState;

/// Plant Disease Detection Server
#[derive(Parser, Debug)]
#[command(name = "plant-diagnosis-server")]
#[command(author = "Warre Snaet")]
#[command(version)]
#[command(about = "Web server for plant leaf disease diagnosis")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PLANT_DIAGNOSIS_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "PLANT_DIAGNOSIS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the ONNX model (overrides the configuration)
    #[arg(short, long, env = "PLANT_DIAGNOSIS_MODEL")]
    model: Option<PathBuf>,

    /// Disable spoken playback of results
    #[arg(long, default_value = "false")]
    no_speech: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the level
    init_logging(&LogConfig::production()).map_err(anyhow::Error::msg)?;

    // Build configuration
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(model) = cli.model {
        config.model.path = model;
    }

    if cli.no_speech {
        config.speech.enabled = false;
    }

    info!("Plant Disease Detection Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Model:      {:?}", config.model.path);
    info!("  Image size: {}", config.ingest.image_size);
    info!("  Advisories: {:?}", config.advisory.table_path);
    info!("  Speech:     {}", config.speech.enabled);
    info!("  Upload cap: {} bytes", config.server.max_upload_bytes);

    // The model is loaded once; the server does not start without it
    let classifier = OnnxClassifier::load(
        &config.model.path,
        config.ingest.image_size,
        config.model.top_k,
    )
    .context("Model could not be loaded")?;
    info!("Loaded {}", classifier.describe());

    // Speech runs on a background worker, off the request path
    let (narrator, speech) = if config.speech.enabled {
        let synthesizer = GoogleSpeech::new(&config.services, &config.speech)?;
        let player = CommandPlayer::from_config(&config.speech);
        let service = SpeechService::new(Arc::new(synthesizer), Arc::new(player));
        let (queue, _worker) = SpeechQueue::spawn(service, config.speech.queue_capacity);
        (Narrator::Queued(queue.clone()), Some(queue))
    } else {
        warn!("Speech is disabled");
        (Narrator::Silent, None)
    };

    let pipeline = DiagnosisPipeline::from_config(&config, Arc::new(classifier), narrator)
        .context("Failed to build diagnosis pipeline")?;

    // Create shared state
    let state = Arc::new(AppState::new(
        pipeline,
        speech,
        config.model.path.clone(),
        config.server.max_upload_bytes,
    ));

    // Build router
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
