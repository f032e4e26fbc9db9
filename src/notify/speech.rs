//! Speech synthesis and audio playback
//!
//! [`SpeechService::speak`] synthesizes a message, writes it to a temporary
//! MP3 file, plays it and removes the file. Removal happens when the temp
//! file handle is dropped, so it also happens when playback fails.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{ServiceConfig, SpeechConfig, PLAYER_FILE_PLACEHOLDER};
use crate::language::Language;
use crate::utils::error::{DiagnosisError, Result, SpeechError};

/// Text to audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
    ) -> std::result::Result<Vec<u8>, SpeechError>;
}

/// Plays an audio file to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> std::result::Result<(), SpeechError>;
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Splits on whitespace where possible; a single word longer than the limit
/// is cut at character boundaries.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let current_len = current.chars().count();
        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Client for the Google Translate text-to-speech endpoint
#[derive(Debug, Clone)]
pub struct GoogleSpeech {
    client: Client,
    endpoint: String,
    max_chunk_chars: usize,
}

impl GoogleSpeech {
    pub fn new(services: &ServiceConfig, speech: &SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(services.timeout_secs))
            .user_agent(services.user_agent.clone())
            .build()
            .map_err(|e| DiagnosisError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: services.tts_url.clone(),
            max_chunk_chars: speech.max_chunk_chars,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
    ) -> std::result::Result<Vec<u8>, SpeechError> {
        let chunks = split_for_speech(text, self.max_chunk_chars);
        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        // MP3 frames concatenate into one playable stream
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language.code()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await
                .map_err(|e| SpeechError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpeechError::Status(status.as_u16()));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SpeechError::Request(e.to_string()))?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        debug!(language = language.code(), chunks = chunks.len(), bytes = audio.len(), "Synthesized speech");
        Ok(audio)
    }
}

/// Plays audio by running an external program
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.player_program.clone(), config.player_args.clone())
    }

    /// Arguments with the file placeholder substituted; the path is appended
    /// when no placeholder is present
    pub fn arguments_for(&self, path: &Path) -> Vec<String> {
        let file = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PLAYER_FILE_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PLAYER_FILE_PLACEHOLDER, &file)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(file.into_owned());
        }
        args
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> std::result::Result<(), SpeechError> {
        let status = Command::new(&self.program)
            .args(self.arguments_for(path))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| SpeechError::Playback(format!("failed to start '{}': {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Playback(format!(
                "'{}' exited with {}",
                self.program, status
            )))
        }
    }
}

/// Synthesize-then-play for a single message
#[derive(Clone)]
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            synthesizer,
            player,
        }
    }

    /// Speak `text` to completion. The temporary audio file is removed
    /// whether or not playback succeeds.
    pub async fn speak(&self, text: &str, language: Language) -> std::result::Result<(), SpeechError> {
        let audio = self.synthesizer.synthesize(text, language).await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        let mut file = tempfile::Builder::new()
            .prefix("plant-diagnosis-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(&audio)?;
        file.flush()?;

        let played = self.player.play(file.path()).await;

        if let Err(e) = file.close() {
            warn!("Failed to remove temporary audio file: {}", e);
        }
        played
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPlayer, StaticSynthesizer};

    #[test]
    fn test_split_respects_limit_and_words() {
        let text = "Prevention includes ensuring proper plant spacing and removing infected leaves.";
        let chunks = split_for_speech(text, 30);

        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_split_cuts_overlong_words_on_char_boundaries() {
        let chunks = split_for_speech("ab चेतावनीचेतावनी cd", 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat().replace(' ', ""), "abचेतावनीचेतावनीcd");
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_for_speech("   ", 100).is_empty());
    }

    #[test]
    fn test_player_argument_substitution() {
        let player = CommandPlayer::new("ffplay", vec!["-autoexit".into(), "{file}".into()]);
        assert_eq!(
            player.arguments_for(Path::new("/tmp/a.mp3")),
            vec!["-autoexit".to_string(), "/tmp/a.mp3".to_string()]
        );

        let bare = CommandPlayer::new("mpg123", vec!["-q".into()]);
        assert_eq!(
            bare.arguments_for(Path::new("/tmp/b.mp3")),
            vec!["-q".to_string(), "/tmp/b.mp3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_speak_plays_then_removes_file() {
        let player = Arc::new(RecordingPlayer::succeeding());
        let service = SpeechService::new(Arc::new(StaticSynthesizer::new(b"ID3audio")), player.clone());

        service.speak("hello", Language::English).await.unwrap();

        let played = player.played();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].1, b"ID3audio".to_vec());
        assert!(!played[0].0.exists());
    }

    #[tokio::test]
    async fn test_temp_file_removed_when_playback_fails() {
        let player = Arc::new(RecordingPlayer::failing());
        let service = SpeechService::new(Arc::new(StaticSynthesizer::new(b"ID3audio")), player.clone());

        let err = service.speak("hello", Language::Hindi).await.unwrap_err();

        assert!(matches!(err, SpeechError::Playback(_)));
        let played = player.played();
        assert_eq!(played.len(), 1);
        assert!(!played[0].0.exists());
    }

    #[tokio::test]
    async fn test_empty_audio_is_not_played() {
        let player = Arc::new(RecordingPlayer::succeeding());
        let service = SpeechService::new(Arc::new(StaticSynthesizer::new(b"")), player.clone());

        let err = service.speak("hello", Language::Tamil).await.unwrap_err();
        assert_eq!(err, SpeechError::EmptyAudio);
        assert!(player.played().is_empty());
    }

    #[tokio::test]
    async fn test_missing_player_program_is_playback_error() {
        let player = CommandPlayer::new("definitely-not-an-audio-player-binary", vec![]);
        let err = player.play(Path::new("/tmp/none.mp3")).await.unwrap_err();
        assert!(matches!(err, SpeechError::Playback(_)));
    }
}
