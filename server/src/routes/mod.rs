//! HTTP routes

pub mod health;
pub mod labels;
pub mod page;
pub mod predict;
pub mod speech;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use plant_diagnosis::Language;

use crate::state::SharedState;

/// GET / - Upload page
pub async fn index(State(_state): State<SharedState>) -> Html<String> {
    Html(page::render_page(Language::default(), None))
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        // Web UI
        .route("/", get(index))
        .route("/predict", post(predict::predict_page))

        // JSON API
        .route("/api/predict", post(predict::predict_json))
        .route("/api/labels", get(labels::list_labels))

        // Health check
        .route("/health", get(health::health_check))

        // Speech outcomes
        .route("/speech/events", get(speech::stream_speech_events))

        // Add state
        .with_state(state)

        // Replaces axum's 2 MB default body cap
        .layer(upload_limit)

        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::Router;

    use plant_diagnosis::config::DEFAULT_MAX_UPLOAD_BYTES;
    use plant_diagnosis::testing::{FixedClassifier, MockTranslator};
    use plant_diagnosis::{AdvisoryTable, ClassLabel, DiagnosisPipeline, Narrator, SpeechQueue};

    use crate::state::AppState;

    pub const BOUNDARY: &str = "leaf-form-boundary";

    pub fn state_for(label: ClassLabel, narrator: Narrator, speech: Option<SpeechQueue>) -> (Arc<AppState>, Arc<FixedClassifier>) {
        limited_state_for(label, narrator, speech, DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn limited_state_for(
        label: ClassLabel,
        narrator: Narrator,
        speech: Option<SpeechQueue>,
        max_upload_bytes: usize,
    ) -> (Arc<AppState>, Arc<FixedClassifier>) {
        let classifier = Arc::new(FixedClassifier::new(label));
        let pipeline = DiagnosisPipeline::new(
            classifier.clone(),
            Arc::new(AdvisoryTable::builtin()),
            Arc::new(MockTranslator::new()),
            narrator,
        );
        let state = AppState::new(
            pipeline,
            speech,
            PathBuf::from("model/test.onnx"),
            max_upload_bytes,
        );
        (Arc::new(state), classifier)
    }

    pub fn router_for(label: ClassLabel) -> (Router, Arc<FixedClassifier>) {
        let (state, classifier) = state_for(label, Narrator::Silent, None);
        (super::router(state), classifier)
    }

    /// A multipart form post with optional `language` and `image` parts
    pub fn multipart_request(uri: &str, language: Option<&str>, image: Option<&[u8]>) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        if let Some(language) = language {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\n{language}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(image) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"leaf.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(image);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }
}
