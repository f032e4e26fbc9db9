//! Application state for the diagnosis server
//!
//! Holds the read-only pipeline (model, advisory table, translator) built once
//! at startup and the handle of the background speech queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use plant_diagnosis::{DiagnosisPipeline, SpeechQueue};

/// Shared application state
pub struct AppState {
    /// Request pipeline, shared read-only by every handler
    pub pipeline: DiagnosisPipeline,
    /// Background speech queue; `None` when speech is disabled
    pub speech: Option<SpeechQueue>,
    /// Path of the loaded model artifact
    pub model_path: PathBuf,
    /// Request body cap on the upload routes
    pub max_upload_bytes: usize,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        pipeline: DiagnosisPipeline,
        speech: Option<SpeechQueue>,
        model_path: PathBuf,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            pipeline,
            speech,
            model_path,
            max_upload_bytes,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
