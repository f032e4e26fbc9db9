//! # Plant Leaf Disease Diagnosis
//!
//! A Rust library that diagnoses plant leaf diseases from a single photo and
//! tells the user what to do about it, in their own language.
//!
//! ## Features
//!
//! - **Image ingestion**: decode any common format, resize to the model's 256x256 input
//! - **Pretrained classifier** loaded from an ONNX export with tract
//! - **Advisories**: treatment and prevention text for every diseased class
//! - **Notifications**: translation into six languages and spoken playback
//!
//! ## Modules
//!
//! - `ingest`: Upload decoding and tensor preparation
//! - `inference`: Classifier trait, ONNX backend and prediction results
//! - `labels`: The ten class labels and the plant/disease split
//! - `advisory`: Status messages, reference links and advisory lookup
//! - `notify`: Translation, speech synthesis, playback and the speech queue
//! - `pipeline`: The end-to-end diagnosis flow
//! - `config`: TOML configuration
//! - `utils`: Errors, logging and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plant_diagnosis::{AppConfig, DiagnosisPipeline, Language, Narrator, OnnxClassifier, UploadedImage};
//!
//! let config = AppConfig::load(None)?;
//! let classifier = OnnxClassifier::load(&config.model.path, 256, 3)?;
//! let pipeline = DiagnosisPipeline::from_config(&config, Arc::new(classifier), Narrator::Silent)?;
//!
//! let bytes = std::fs::read("leaf.jpg")?;
//! let report = pipeline.diagnose(Some(UploadedImage::new(bytes)), Language::Hindi).await?;
//! println!("{}", report.title());
//! ```

pub mod advisory;
pub mod config;
pub mod inference;
pub mod ingest;
pub mod labels;
pub mod language;
pub mod notify;
pub mod pipeline;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;

// Re-export commonly used items for convenience
pub use advisory::{AdvisoryRecord, AdvisoryStatus, AdvisoryTable, Diagnosis, ReferenceLink};
pub use config::AppConfig;
pub use inference::{LeafClassifier, OnnxClassifier, Prediction};
pub use ingest::{ChannelOrder, IngestConfig, ResizePolicy, UploadedImage};
pub use labels::{ClassLabel, CLASS_NAMES, NUM_CLASSES};
pub use language::Language;
pub use notify::{NarrationStatus, Narrator, SpeechEvent, SpeechQueue, SpeechService};
pub use pipeline::{DiagnosisPipeline, DiagnosisReport, MessageBlock, MessageKind};
pub use utils::error::{DiagnosisError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
