//! Notification fan-out: translation and speech
//!
//! Every message the pipeline produces is translated into the selected
//! language and, when translation succeeded, handed to the [`Narrator`].
//! Neither translation nor speech failures stop the pipeline.

pub mod queue;
pub mod speech;
pub mod translate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::language::Language;

pub use queue::{SpeechEvent, SpeechOutcome, SpeechQueue};
pub use speech::{split_for_speech, AudioPlayer, CommandPlayer, GoogleSpeech, SpeechService, SpeechSynthesizer};
pub use translate::{GoogleTranslator, Translator};

/// How a message was voiced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "speech", rename_all = "snake_case")]
pub enum NarrationStatus {
    /// Spoken to completion before the pipeline moved on
    Spoken,
    /// Handed to the background queue
    Queued,
    /// Speech disabled or text not translated
    Skipped,
    /// Synthesis, playback or queueing failed
    Failed { error: String },
}

/// Playback strategy for spoken messages
#[derive(Clone)]
pub enum Narrator {
    /// Speak each message to completion in turn
    Blocking(Arc<SpeechService>),
    /// Queue messages for the background speech worker
    Queued(SpeechQueue),
    /// No speech
    Silent,
}

impl Narrator {
    pub async fn speak(&self, text: &str, language: Language) -> NarrationStatus {
        match self {
            Narrator::Blocking(service) => match service.speak(text, language).await {
                Ok(()) => NarrationStatus::Spoken,
                Err(e) => {
                    warn!(language = language.code(), "Error in text-to-speech conversion: {}", e);
                    NarrationStatus::Failed {
                        error: e.to_string(),
                    }
                }
            },
            Narrator::Queued(queue) => {
                if queue.enqueue(text, language) {
                    NarrationStatus::Queued
                } else {
                    NarrationStatus::Failed {
                        error: "speech queue unavailable".to_string(),
                    }
                }
            }
            Narrator::Silent => NarrationStatus::Skipped,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Narrator::Blocking(_) => "blocking",
            Narrator::Queued(_) => "queued",
            Narrator::Silent => "off",
        }
    }
}
