//! The diagnosis pipeline
//!
//! upload → decode/resize → predict → advisory lookup → translate → speak.
//!
//! Control flows strictly forward. A missing or undecodable upload ends the
//! request before the model runs; every later failure (translation, speech)
//! is recorded in the report and the remaining steps still run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advisory::{AdvisoryStatus, AdvisoryTable, Diagnosis};
use crate::config::AppConfig;
use crate::inference::{LeafClassifier, RankedClass};
use crate::ingest::{ingest, IngestConfig, UploadedImage};
use crate::labels::ClassLabel;
use crate::language::Language;
use crate::notify::{GoogleTranslator, NarrationStatus, Narrator, Translator};
use crate::utils::error::{DiagnosisError, Result};
use crate::utils::StageTimer;

/// Role of a message in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Status,
    Treatment,
    Prevention,
    NoAdvisory,
}

impl MessageKind {
    pub fn heading(self) -> &'static str {
        match self {
            MessageKind::Status => "Translated message:",
            MessageKind::Treatment => "Treatment:",
            MessageKind::Prevention => "Prevention:",
            MessageKind::NoAdvisory => "Advisory:",
        }
    }
}

/// Result of translating one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Translated { text: String },
    Failed { error: String },
}

/// One translated (or failed) message and how it was voiced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBlock {
    pub kind: MessageKind,
    pub original: String,
    pub translation: TranslationOutcome,
    pub narration: NarrationStatus,
}

impl MessageBlock {
    /// Text shown to the user: the translation or the inline error
    pub fn display_text(&self) -> String {
        match &self.translation {
            TranslationOutcome::Translated { text } => text.clone(),
            TranslationOutcome::Failed { error } => format!("Translation error: {}", error),
        }
    }

    pub fn translated(&self) -> Option<&str> {
        match &self.translation {
            TranslationOutcome::Translated { text } => Some(text),
            TranslationOutcome::Failed { .. } => None,
        }
    }
}

/// Size information about the upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub resized: bool,
    pub mime_type: Option<String>,
    /// Client-side file name, when the upload carried one
    pub file_name: Option<String>,
}

/// What the classifier said
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub label: ClassLabel,
    pub class_index: usize,
    pub confidence: f32,
    /// Winning probability minus the runner-up
    pub margin: f32,
    /// Confidence fell below the configured threshold; the label is still reported
    pub low_confidence: bool,
    pub top_k: Vec<RankedClass>,
    pub inference_time_ms: f64,
}

/// Everything produced for one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub request_id: Uuid,
    pub language: Language,
    pub image: ImageSummary,
    pub prediction: PredictionSummary,
    pub diagnosis: Diagnosis,
    pub messages: Vec<MessageBlock>,
}

impl DiagnosisReport {
    /// Headline in the source language
    pub fn title(&self) -> &str {
        &self.diagnosis.status_message
    }

    pub fn message(&self, kind: MessageKind) -> Option<&MessageBlock> {
        self.messages.iter().find(|m| m.kind == kind)
    }
}

/// Shared, read-only pipeline; one instance serves every request
#[derive(Clone)]
pub struct DiagnosisPipeline {
    classifier: Arc<dyn LeafClassifier>,
    advisories: Arc<AdvisoryTable>,
    translator: Arc<dyn Translator>,
    narrator: Narrator,
    ingest: IngestConfig,
    low_confidence_threshold: f32,
}

impl DiagnosisPipeline {
    pub fn new(
        classifier: Arc<dyn LeafClassifier>,
        advisories: Arc<AdvisoryTable>,
        translator: Arc<dyn Translator>,
        narrator: Narrator,
    ) -> Self {
        let ingest = IngestConfig {
            image_size: classifier.input_size(),
            ..IngestConfig::default()
        };
        Self {
            classifier,
            advisories,
            translator,
            narrator,
            ingest,
            low_confidence_threshold: 0.5,
        }
    }

    /// Build with the configured advisory table and the Google translator
    pub fn from_config(
        config: &AppConfig,
        classifier: Arc<dyn LeafClassifier>,
        narrator: Narrator,
    ) -> Result<Self> {
        if config.ingest.image_size != classifier.input_size() {
            return Err(DiagnosisError::Config(format!(
                "ingest.image_size is {} but the classifier expects {}",
                config.ingest.image_size,
                classifier.input_size()
            )));
        }

        let advisories = AdvisoryTable::load(config.advisory.table_path.as_deref())?;
        let translator = GoogleTranslator::new(&config.services)?;

        Ok(Self::new(classifier, Arc::new(advisories), Arc::new(translator), narrator)
            .with_ingest_config(config.ingest.clone())
            .with_low_confidence_threshold(config.model.low_confidence_threshold))
    }

    pub fn with_ingest_config(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_low_confidence_threshold(mut self, threshold: f32) -> Self {
        self.low_confidence_threshold = threshold;
        self
    }

    pub fn classifier(&self) -> &Arc<dyn LeafClassifier> {
        &self.classifier
    }

    pub fn advisories(&self) -> &AdvisoryTable {
        &self.advisories
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Run one submission through every stage
    pub async fn diagnose(
        &self,
        upload: Option<UploadedImage>,
        language: Language,
    ) -> Result<DiagnosisReport> {
        let upload = upload
            .filter(|u| !u.bytes.is_empty())
            .ok_or(DiagnosisError::NoImageUploaded)?;

        let request_id = Uuid::new_v4();
        let mut timer = StageTimer::new(&request_id.to_string());

        let prepared = ingest(&upload.bytes, &self.ingest)?;
        let image = ImageSummary {
            width: prepared.original_width,
            height: prepared.original_height,
            resized: prepared.resized,
            mime_type: upload.mime_type().map(str::to_string),
            file_name: upload.file_name.clone(),
        };
        timer.mark("ingest");
        debug!(
            request = %request_id,
            file = upload.file_name.as_deref().unwrap_or("-"),
            width = image.width,
            height = image.height,
            resized = image.resized,
            "Upload decoded"
        );

        let classifier = Arc::clone(&self.classifier);
        let tensor = prepared.tensor;
        let prediction = tokio::task::spawn_blocking(move || classifier.predict(&tensor))
            .await
            .map_err(|e| DiagnosisError::Inference(format!("inference task failed: {}", e)))??;
        timer.mark("predict");

        let low_confidence = prediction.is_low_confidence(self.low_confidence_threshold);
        if low_confidence {
            warn!(
                request = %request_id,
                label = %prediction.label,
                confidence = prediction.confidence,
                threshold = self.low_confidence_threshold,
                "Low-confidence prediction reported as-is"
            );
        } else {
            info!(
                request = %request_id,
                label = %prediction.label,
                confidence = prediction.confidence,
                "Prediction"
            );
        }

        let diagnosis = self.advisories.diagnose(prediction.label);
        timer.mark("advisory");

        let mut messages = vec![
            self.notify(MessageKind::Status, &diagnosis.status_message, language)
                .await,
        ];
        match &diagnosis.advisory {
            AdvisoryStatus::Healthy => {}
            AdvisoryStatus::Available(record) => {
                messages.push(
                    self.notify(MessageKind::Treatment, &record.treatment, language)
                        .await,
                );
                messages.push(
                    self.notify(MessageKind::Prevention, &record.prevention, language)
                        .await,
                );
            }
            AdvisoryStatus::Unavailable { message } => {
                messages.push(self.notify(MessageKind::NoAdvisory, message, language).await);
            }
        }
        timer.mark("notify");
        timer.finish();

        Ok(DiagnosisReport {
            request_id,
            language,
            image,
            prediction: PredictionSummary {
                label: prediction.label,
                class_index: prediction.class_index,
                confidence: prediction.confidence,
                margin: prediction.margin(),
                low_confidence,
                top_k: prediction.top_k,
                inference_time_ms: prediction.inference_time_ms,
            },
            diagnosis,
            messages,
        })
    }

    /// Translate one message and voice it when translation succeeded
    async fn notify(&self, kind: MessageKind, text: &str, language: Language) -> MessageBlock {
        match self.translator.translate(text, language).await {
            Ok(translated) => {
                let narration = self.narrator.speak(&translated, language).await;
                MessageBlock {
                    kind,
                    original: text.to_string(),
                    translation: TranslationOutcome::Translated { text: translated },
                    narration,
                }
            }
            Err(e) => {
                warn!(kind = ?kind, language = language.code(), "Translation error: {}", e);
                MessageBlock {
                    kind,
                    original: text.to_string(),
                    translation: TranslationOutcome::Failed {
                        error: e.to_string(),
                    },
                    narration: NarrationStatus::Skipped,
                }
            }
        }
    }
}
