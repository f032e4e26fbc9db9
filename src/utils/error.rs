//! Error Handling Module
//!
//! Defines the error types for the diagnosis pipeline.
//! Uses thiserror for ergonomic error definitions.
//!
//! Each external collaborator has its own error type so call sites have to
//! decide what a failure means for the request:
//! - [`InvalidImageError`] stops the request at the ingestion boundary
//! - [`TranslationError`] becomes an inline message, the pipeline continues
//! - [`SpeechError`] is logged (or published on the speech event channel)

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for diagnosis operations
#[derive(Error, Debug)]
pub enum DiagnosisError {
    /// The request carried no image bytes
    #[error("No image uploaded. Please upload an image to proceed.")]
    NoImageUploaded,

    /// The upload could not be turned into a model input
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    /// Model artifact missing, corrupt or incompatible
    #[error("Failed to load model at '{0}': {1}")]
    ModelLoad(PathBuf, String),

    /// Error while running the model
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// The uploaded bytes are not a usable leaf image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidImageError {
    #[error("Invalid image: the upload is empty")]
    Empty,

    #[error("Invalid image: unrecognized or unsupported image format")]
    UnsupportedFormat,

    #[error("Invalid image: failed to decode ({0})")]
    Decode(String),

    #[error("Invalid image: {width}x{height} image has no pixels")]
    ZeroSized { width: u32, height: u32 },

    #[error("Invalid image: expected {expected}x{expected} pixels, got {width}x{height}")]
    DimensionMismatch { expected: u32, width: u32, height: u32 },
}

/// Failure of a single translation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translation service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected translation response: {0}")]
    MalformedResponse(String),
}

/// Failure while synthesizing or playing speech
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Request(String),

    #[error("speech service returned HTTP {0}")]
    Status(u16),

    #[error("speech service returned no audio")]
    EmptyAudio,

    #[error("audio file error: {0}")]
    Io(String),

    #[error("audio playback failed: {0}")]
    Playback(String),
}

impl From<std::io::Error> for SpeechError {
    fn from(err: std::io::Error) -> Self {
        SpeechError::Io(err.to_string())
    }
}

/// Convenience Result type for diagnosis operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;

/// Extension trait for turning foreign errors into configuration errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| DiagnosisError::Config(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| DiagnosisError::Config(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DiagnosisError::Config(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| DiagnosisError::Config(f()))
    }
}
