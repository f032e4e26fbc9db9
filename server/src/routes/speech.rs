//! Speech event stream
//!
//! Speech runs on a background worker, so the result page returns before the
//! messages are read aloud. Clients follow playback through this SSE stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::StreamExt;

use crate::state::SharedState;

/// GET /speech/events - SSE stream of speech outcomes
pub async fn stream_speech_events(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let receiver = match &state.speech {
        Some(queue) => queue.subscribe(),
        None => {
            return Err((StatusCode::NOT_FOUND, "Speech is disabled".to_string()));
        }
    };

    let stream = tokio_stream::wrappers::BroadcastStream::new(receiver).filter_map(|result| {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().event("speech").data(data)))
            }
            Err(_) => None, // Skip lagged messages
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt as _;
    use tower::ServiceExt;

    use plant_diagnosis::testing::{RecordingPlayer, StaticSynthesizer};
    use plant_diagnosis::{ClassLabel, Language, Narrator, SpeechQueue, SpeechService};

    use crate::routes::router;
    use crate::routes::test_support::{router_for, state_for};

    #[tokio::test]
    async fn test_disabled_speech_is_404() {
        let (app, _) = router_for(ClassLabel::AppleHealthy);
        let response = app
            .oneshot(Request::builder().uri("/speech/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_queued_speech_is_streamed() {
        let service = SpeechService::new(
            Arc::new(StaticSynthesizer::new(b"ID3")),
            Arc::new(RecordingPlayer::succeeding()),
        );
        let (queue, _worker) = SpeechQueue::spawn(service, 4);
        let (state, _) = state_for(
            ClassLabel::AppleHealthy,
            Narrator::Queued(queue.clone()),
            Some(queue.clone()),
        );

        let response = router(state)
            .oneshot(Request::builder().uri("/speech/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        assert!(queue.enqueue("The Apple leaf is healthy!", Language::English));

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: speech"));
        assert!(text.contains("The Apple leaf is healthy!"));
        assert!(text.contains("\"outcome\":\"spoken\""));
    }
}
