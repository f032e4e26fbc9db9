//! Background speech queue
//!
//! Keeps synthesis and playback off the request path. Messages are spoken
//! one at a time in submission order by a single worker task. Outcomes are
//! logged and published on a broadcast channel that the server exposes as
//! an event stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::language::Language;

use super::speech::SpeechService;

/// Capacity of the event broadcast buffer
const EVENT_BUFFER: usize = 256;

/// What happened to one queued message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SpeechOutcome {
    Spoken,
    Failed { error: String },
    Dropped { reason: String },
}

/// Published once per queued message
#[derive(Clone, Debug, Serialize)]
pub struct SpeechEvent {
    pub timestamp: DateTime<Utc>,
    pub language: Language,
    pub text: String,
    #[serde(flatten)]
    pub outcome: SpeechOutcome,
}

#[derive(Debug)]
struct SpeechRequest {
    text: String,
    language: Language,
}

/// Handle for submitting messages to the speech worker
#[derive(Clone)]
pub struct SpeechQueue {
    tx: mpsc::Sender<SpeechRequest>,
    events: broadcast::Sender<SpeechEvent>,
}

impl SpeechQueue {
    /// Start the worker task. It runs until every queue handle is dropped.
    pub fn spawn(service: SpeechService, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<SpeechRequest>(capacity.max(1));
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let worker_events = events.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let outcome = match service.speak(&request.text, request.language).await {
                    Ok(()) => {
                        info!(language = request.language.code(), "Spoke message");
                        SpeechOutcome::Spoken
                    }
                    Err(e) => {
                        warn!(language = request.language.code(), "Error in text-to-speech conversion: {}", e);
                        SpeechOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };

                // No subscribers is fine
                let _ = worker_events.send(SpeechEvent {
                    timestamp: Utc::now(),
                    language: request.language,
                    text: request.text,
                    outcome,
                });
            }
        });

        (Self { tx, events }, handle)
    }

    /// Queue a message without waiting for it to be spoken.
    ///
    /// Returns `false` when the queue is full or the worker has stopped; the
    /// message is then reported as dropped.
    pub fn enqueue(&self, text: &str, language: Language) -> bool {
        let request = SpeechRequest {
            text: text.to_string(),
            language,
        };

        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(err) => {
                let reason = match &err {
                    mpsc::error::TrySendError::Full(_) => "speech queue is full",
                    mpsc::error::TrySendError::Closed(_) => "speech worker has stopped",
                };
                warn!(language = language.code(), "Dropping speech message: {}", reason);
                let _ = self.events.send(SpeechEvent {
                    timestamp: Utc::now(),
                    language,
                    text: text.to_string(),
                    outcome: SpeechOutcome::Dropped {
                        reason: reason.to_string(),
                    },
                });
                false
            }
        }
    }

    /// Receive outcomes of messages queued after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }
}
