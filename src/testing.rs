//! In-memory stand-ins for the model and the external services.
//!
//! Used by the unit tests here and by the server's route tests; they never
//! touch the network or an audio device.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::inference::{LeafClassifier, Prediction};
use crate::ingest::ImageTensor;
use crate::labels::{ClassLabel, NUM_CLASSES};
use crate::language::Language;
use crate::notify::{AudioPlayer, SpeechSynthesizer, Translator};
use crate::utils::error::{Result, SpeechError, TranslationError};

/// Always predicts the same label and counts how often it was asked
pub struct FixedClassifier {
    label: ClassLabel,
    confidence: f32,
    input_size: u32,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(label: ClassLabel) -> Self {
        Self::with_confidence(label, 0.9)
    }

    pub fn with_confidence(label: ClassLabel, confidence: f32) -> Self {
        Self {
            label,
            confidence,
            input_size: 256,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LeafClassifier for FixedClassifier {
    fn predict(&self, _tensor: &ImageTensor) -> Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let rest = (1.0 - self.confidence) / (NUM_CLASSES - 1) as f32;
        let mut probabilities = vec![rest; NUM_CLASSES];
        probabilities[self.label.index()] = self.confidence;

        Prediction::from_probabilities(probabilities, Duration::from_millis(1), 3)
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}

/// Deterministic translator: `"[<code>] <text>"`, optionally failing on
/// texts that contain a marker
#[derive(Default)]
pub struct MockTranslator {
    fail_on: Option<String>,
    calls: Mutex<Vec<(String, Language)>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// What the mock returns for a given input
    pub fn expected(text: &str, language: Language) -> String {
        format!("[{}] {}", language.code(), text)
    }

    pub fn calls(&self) -> Vec<(String, Language)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
    ) -> std::result::Result<String, TranslationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((text.to_string(), target));
        }
        match &self.fail_on {
            Some(marker) if text.contains(marker.as_str()) => {
                Err(TranslationError::Request("service unavailable".to_string()))
            }
            _ => Ok(Self::expected(text, target)),
        }
    }
}

/// Returns the same audio bytes for every request
pub struct StaticSynthesizer {
    audio: Vec<u8>,
}

impl StaticSynthesizer {
    pub fn new(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for StaticSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: Language,
    ) -> std::result::Result<Vec<u8>, SpeechError> {
        Ok(self.audio.clone())
    }
}

/// Records every file it is asked to play along with the file's contents
pub struct RecordingPlayer {
    fail: bool,
    played: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl RecordingPlayer {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn played(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, path: &Path) -> std::result::Result<(), SpeechError> {
        let contents = std::fs::read(path)?;
        if let Ok(mut played) = self.played.lock() {
            played.push((path.to_path_buf(), contents));
        }
        if self.fail {
            Err(SpeechError::Playback("audio device unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Returns the text itself as "audio", so players can see what was spoken
pub struct EchoSynthesizer;

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _language: Language,
    ) -> std::result::Result<Vec<u8>, SpeechError> {
        Ok(text.as_bytes().to_vec())
    }
}

/// A solid-color PNG of the given size
pub fn leaf_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([34, 139, 34]));
    crate::ingest::encode_image(&image::DynamicImage::ImageRgb8(img), image::ImageFormat::Png)
        .unwrap_or_default()
}

/// A PNG of pseudo-random pixels; compresses poorly, so its size tracks
/// `width * height * 3`
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x9e37_79b9;
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });
    crate::ingest::encode_image(&image::DynamicImage::ImageRgb8(img), image::ImageFormat::Png)
        .unwrap_or_default()
}
