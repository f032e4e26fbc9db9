//! Prediction endpoints - HTML form submission and JSON API

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use base64::Engine;
use serde::Serialize;
use tracing::{error, warn};

use plant_diagnosis::{DiagnosisError, DiagnosisReport, Language, UploadedImage};

use super::page::{render_error, render_page, render_report};
use crate::state::SharedState;

/// Parsed multipart submission
#[derive(Debug)]
pub struct PredictForm {
    pub language: Language,
    pub upload: Option<UploadedImage>,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Map a multipart read failure; an over-limit body becomes 413
fn form_error(e: MultipartError) -> (StatusCode, String) {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload exceeds the body limit: {}", e);
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Image too large: the upload exceeds the server's size limit".to_string(),
        );
    }
    warn!("Malformed multipart body: {}", e);
    (StatusCode::BAD_REQUEST, format!("Malformed form data: {}", e))
}

/// Read the `language` and `image` fields; unknown fields are ignored
pub async fn read_form(mut multipart: Multipart) -> Result<PredictForm, (StatusCode, String)> {
    let mut language = Language::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        match field.name() {
            Some("language") => {
                let value = field.text().await.map_err(form_error)?;
                language = value
                    .parse()
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("{}", e)))?;
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(form_error)?;
                let mut image = UploadedImage::new(bytes.to_vec());
                if let Some(name) = file_name {
                    image = image.with_file_name(name);
                }
                upload = Some(image);
            }
            _ => {}
        }
    }

    Ok(PredictForm { language, upload })
}

/// HTTP status for a request that failed in the pipeline
pub fn error_status(err: &DiagnosisError) -> StatusCode {
    match err {
        DiagnosisError::NoImageUploaded => StatusCode::BAD_REQUEST,
        DiagnosisError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(err: &DiagnosisError) -> &'static str {
    match err {
        DiagnosisError::NoImageUploaded => "no_image_uploaded",
        DiagnosisError::InvalidImage(_) => "invalid_image",
        DiagnosisError::ModelLoad(..) | DiagnosisError::Inference(_) => "inference",
        DiagnosisError::Config(_) => "internal",
    }
}

fn data_uri(upload: &UploadedImage) -> Option<String> {
    if upload.bytes.is_empty() {
        return None;
    }
    let mime = upload.mime_type().unwrap_or("image/jpeg");
    let encoded = base64::engine::general_purpose::STANDARD.encode(&upload.bytes);
    Some(format!("data:{};base64,{}", mime, encoded))
}

async fn run(state: &SharedState, form: PredictForm) -> Result<DiagnosisReport, DiagnosisError> {
    state.pipeline.diagnose(form.upload, form.language).await.map_err(|e| {
        if error_status(&e).is_server_error() {
            error!("Diagnosis failed: {}", e);
        } else {
            warn!("Rejected submission: {}", e);
        }
        e
    })
}

/// POST /predict - Diagnose an uploaded leaf and render the result page
pub async fn predict_page(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err((status, message)) => {
            let body = render_error(&message);
            return (status, Html(render_page(Language::default(), Some(&body))));
        }
    };

    let language = form.language;
    let image = form.upload.as_ref().and_then(data_uri);

    match run(&state, form).await {
        Ok(report) => {
            let body = render_report(&report, image.as_deref());
            (StatusCode::OK, Html(render_page(language, Some(&body))))
        }
        Err(e) => {
            let body = render_error(&e.to_string());
            (error_status(&e), Html(render_page(language, Some(&body))))
        }
    }
}

/// POST /api/predict - Diagnose an uploaded leaf and return the report as JSON
pub async fn predict_json(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<DiagnosisReport>, (StatusCode, Json<ErrorResponse>)> {
    let form = read_form(multipart).await.map_err(|(status, message)| {
        let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "too_large"
        } else {
            "bad_request"
        };
        (status, Json(ErrorResponse { error: message, kind }))
    })?;

    run(&state, form).await.map(Json).map_err(|e| {
        (
            error_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
                kind: error_kind(&e),
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use plant_diagnosis::testing::{leaf_png, noisy_png, MockTranslator};
    use plant_diagnosis::{ClassLabel, Narrator};

    use crate::routes::router;
    use crate::routes::test_support::{limited_state_for, multipart_request, router_for};

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_predict_page_renders_apple_scab_in_hindi() {
        let (app, classifier) = router_for(ClassLabel::AppleScab);
        let png = leaf_png(256, 256);

        let response = app
            .oneshot(multipart_request("/predict", Some("hi"), Some(png.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Warning! This is a Apple leaf with Apple scab."));
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("<h3>Treatment:</h3>"));
        assert!(html.contains("<h3>Prevention:</h3>"));
        assert!(html.contains(
            "href=\"https://en.wikipedia.org/wiki/Apple-scab\" target=\"_blank\""
        ));
        let translated = MockTranslator::expected(
            "Warning! This is a Apple leaf with Apple scab.",
            plant_diagnosis::Language::Hindi,
        );
        assert!(html.contains(&translated));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_upload_is_400_without_model_call() {
        let (app, classifier) = router_for(ClassLabel::AppleScab);

        let response = app
            .oneshot(multipart_request("/predict", Some("en"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("No image uploaded. Please upload an image to proceed."));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_part_counts_as_missing_upload() {
        let (app, classifier) = router_for(ClassLabel::AppleScab);

        let response = app
            .oneshot(multipart_request("/predict", Some("en"), Some(&[][..])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_upload_is_422() {
        let (app, classifier) = router_for(ClassLabel::AppleScab);

        let response = app
            .oneshot(multipart_request("/predict", None, Some(&b"not an image"[..])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Invalid image"));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_language_is_rejected() {
        let (app, _) = router_for(ClassLabel::AppleScab);
        let png = leaf_png(32, 32);

        let response = app
            .oneshot(multipart_request("/api/predict", Some("klingon"), Some(png.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_predict_returns_report_json() {
        let (app, _) = router_for(ClassLabel::PotatoHealthy);
        let png = leaf_png(300, 200);

        let response = app
            .oneshot(multipart_request("/api/predict", Some("Telugu"), Some(png.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["prediction"]["label"], "Potato_healthy");
        assert_eq!(json["diagnosis"]["status_message"], "The Potato leaf is healthy!");
        assert_eq!(json["diagnosis"]["reference"], serde_json::Value::Null);
        assert_eq!(json["language"], "Telugu");
        assert_eq!(json["image"]["resized"], true);
        assert_eq!(json["image"]["file_name"], "leaf.png");
        assert!(json["prediction"]["margin"].as_f64().unwrap() > 0.8);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_api_predict_error_is_json() {
        let (app, _) = router_for(ClassLabel::PotatoHealthy);

        let response = app
            .oneshot(multipart_request("/api/predict", Some("en"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["kind"], "no_image_uploaded");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_rejected() {
        let (app, classifier) = router_for(ClassLabel::PotatoHealthy);

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_phone_sized_photo_is_accepted() {
        let (app, classifier) = router_for(ClassLabel::AppleScab);
        let png = noisy_png(1200, 1000);
        assert!(png.len() > 2 * 1024 * 1024);

        let response = app
            .oneshot(multipart_request("/predict", Some("en"), Some(png.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Warning! This is a Apple leaf with Apple scab."));
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_upload_over_configured_limit_is_413() {
        let (state, classifier) =
            limited_state_for(ClassLabel::AppleScab, Narrator::Silent, None, 64 * 1024);
        let png = noisy_png(300, 300);
        assert!(png.len() > 64 * 1024);

        let response = router(state.clone())
            .oneshot(multipart_request("/predict", Some("en"), Some(png.as_slice())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_text(response).await.contains("Image too large"));

        let response = router(state)
            .oneshot(multipart_request("/api/predict", Some("en"), Some(png.as_slice())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["kind"], "too_large");
        assert_eq!(classifier.calls(), 0);
    }
}
