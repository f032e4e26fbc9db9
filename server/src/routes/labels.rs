//! Label listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use plant_diagnosis::{AdvisoryStatus, ClassLabel};

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct LabelInfo {
    pub index: usize,
    pub label: ClassLabel,
    pub plant_type: String,
    pub disease: String,
    pub healthy: bool,
    /// Whether the advisory table has treatment and prevention text
    pub has_advisory: bool,
}

/// GET /api/labels - Class labels with advisory coverage
pub async fn list_labels(State(state): State<SharedState>) -> Json<Vec<LabelInfo>> {
    let advisories = state.pipeline.advisories();
    let labels = ClassLabel::ALL
        .into_iter()
        .map(|label| {
            let diagnosis = advisories.diagnose(label);
            LabelInfo {
                index: label.index(),
                label,
                plant_type: diagnosis.plant_type,
                disease: diagnosis.disease,
                healthy: diagnosis.healthy,
                has_advisory: matches!(diagnosis.advisory, AdvisoryStatus::Available(_)),
            }
        })
        .collect();
    Json(labels)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use plant_diagnosis::ClassLabel;

    use crate::routes::test_support::router_for;

    #[tokio::test]
    async fn test_labels_cover_every_diseased_class() {
        let (app, _) = router_for(ClassLabel::AppleHealthy);
        let response = app
            .oneshot(Request::builder().uri("/api/labels").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let labels: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0]["label"], "Apple_Apple scab");
        assert_eq!(labels[0]["plant_type"], "Apple");
        assert_eq!(labels[0]["disease"], "Apple scab");
        for label in &labels {
            let healthy = label["healthy"].as_bool().unwrap();
            assert_eq!(label["has_advisory"].as_bool().unwrap(), !healthy);
        }
    }
}
