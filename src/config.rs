//! Configuration for the diagnosis pipeline.
//!
//! Every field has a default, so an empty (or absent) TOML file yields a
//! working configuration. Binaries layer their command-line flags on top.
//!
//! ```toml
//! [model]
//! path = "model/plant_disease_model.onnx"
//! low_confidence_threshold = 0.5
//!
//! [ingest]
//! image_size = 256
//! resize = "bilinear"
//! channel_order = "bgr"
//!
//! [speech]
//! enabled = true
//! player_program = "ffplay"
//!
//! [server]
//! max_upload_bytes = 209715200
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ingest::IngestConfig;
use crate::utils::error::{DiagnosisError, Result};

/// Default location of the model artifact
pub const DEFAULT_MODEL_PATH: &str = "model/plant_disease_model.onnx";

/// Default translation endpoint
pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Default speech synthesis endpoint
pub const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Default cap on an uploaded request body
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Placeholder in player arguments replaced by the audio file path
pub const PLAYER_FILE_PLACEHOLDER: &str = "{file}";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub ingest: IngestConfig,
    pub services: ServiceConfig,
    pub speech: SpeechConfig,
    pub advisory: AdvisoryConfig,
    pub server: ServerSettings,
}

/// Model artifact and prediction reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the ONNX export of the classifier
    pub path: PathBuf,
    /// Predictions below this probability are flagged, never suppressed
    pub low_confidence_threshold: f32,
    /// Number of ranked alternatives kept in a prediction
    pub top_k: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            low_confidence_threshold: 0.5,
            top_k: 3,
        }
    }
}

/// Translation and speech service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub translate_url: String,
    pub tts_url: String,
    /// Timeout for each outbound request, in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            translate_url: DEFAULT_TRANSLATE_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            timeout_secs: 15,
            user_agent: format!("plant_diagnosis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Speech synthesis and playback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// External program used to play MP3 files
    pub player_program: String,
    /// Arguments for the player; `{file}` is replaced by the audio path
    pub player_args: Vec<String>,
    /// Pending messages the background speech queue holds before dropping
    pub queue_capacity: usize,
    /// Longest text sent to the speech service in one request
    pub max_chunk_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player_program: "ffplay".to_string(),
            player_args: vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
                PLAYER_FILE_PLACEHOLDER.to_string(),
            ],
            queue_capacity: 32,
            max_chunk_chars: 100,
        }
    }
}

/// Where advisory texts come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// JSON file replacing the built-in advisory table
    pub table_path: Option<PathBuf>,
}

/// Web front end limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Largest request body accepted on the upload routes
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: AppConfig = match path {
            Some(path) => load_toml_config(path)?,
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.ingest.image_size == 0 {
            return Err(DiagnosisError::Config(
                "ingest.image_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.model.low_confidence_threshold) {
            return Err(DiagnosisError::Config(format!(
                "model.low_confidence_threshold must be within [0, 1], got {}",
                self.model.low_confidence_threshold
            )));
        }
        if self.speech.enabled && self.speech.player_program.trim().is_empty() {
            return Err(DiagnosisError::Config(
                "speech.player_program is empty while speech is enabled".to_string(),
            ));
        }
        if self.speech.max_chunk_chars == 0 {
            return Err(DiagnosisError::Config(
                "speech.max_chunk_chars must be greater than zero".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(DiagnosisError::Config(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.services.timeout_secs == 0 {
            return Err(DiagnosisError::Config(
                "services.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path).map_err(|e| {
        DiagnosisError::Config(format!("Failed to read config {}: {e}", path.display()))
    })?;

    toml::from_str(&content).map_err(|e| {
        DiagnosisError::Config(format!("Failed to parse config {}: {e}", path.display()))
    })
}
