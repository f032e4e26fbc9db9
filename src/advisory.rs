//! Advisory lookup: from a predicted label to what the user is told
//!
//! Healthy labels get a positive status message and nothing else. Diseased
//! labels get a warning, a reference link and, when the table has an entry,
//! treatment and prevention text. A diseased label without an entry is an
//! expected case reported as [`AdvisoryStatus::Unavailable`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::labels::{split_label, ClassLabel, HEALTHY};
use crate::utils::error::{DiagnosisError, Result, ResultExt};

/// Base of the generated reference links
pub const REFERENCE_BASE_URL: &str = "https://en.wikipedia.org/wiki/";

/// Canned treatment and prevention text for one diseased label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    pub treatment: String,
    pub prevention: String,
}

impl AdvisoryRecord {
    fn new(treatment: &str, prevention: &str) -> Self {
        Self {
            treatment: treatment.to_string(),
            prevention: prevention.to_string(),
        }
    }
}

/// Outbound link to a reference page about the disease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub url: String,
    pub text: String,
}

/// Build the reference link for a disease: spaces become dashes
pub fn reference_link(plant_type: &str, disease: &str) -> ReferenceLink {
    ReferenceLink {
        url: format!("{}{}", REFERENCE_BASE_URL, disease.replace(' ', "-")),
        text: format!(
            "Click here to learn more about {} and {}",
            plant_type, disease
        ),
    }
}

/// What the advisory table could say about a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvisoryStatus {
    /// Healthy leaf, no lookup performed
    Healthy,
    /// Treatment and prevention text found
    Available(AdvisoryRecord),
    /// Diseased leaf with no table entry
    Unavailable { message: String },
}

/// Everything the advisory stage derives from one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub label: ClassLabel,
    pub plant_type: String,
    pub disease: String,
    pub healthy: bool,
    /// Headline shown as the page title and spoken first
    pub status_message: String,
    pub reference: Option<ReferenceLink>,
    pub advisory: AdvisoryStatus,
}

/// Read-only table of advisory records keyed by label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryTable {
    entries: BTreeMap<ClassLabel, AdvisoryRecord>,
}

impl Default for AdvisoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AdvisoryTable {
    /// The canned advisories shipped with the application
    pub fn builtin() -> Self {
        let entries = BTreeMap::from([
            (
                ClassLabel::AppleScab,
                AdvisoryRecord::new(
                    "Treatment includes removing affected leaves, applying fungicides, and ensuring proper airflow.",
                    "Prevention includes planting disease-resistant varieties and ensuring proper pruning.",
                ),
            ),
            (
                ClassLabel::AppleBlackRot,
                AdvisoryRecord::new(
                    "Treat with fungicides and ensure proper sanitation in orchards.",
                    "Prevent by removing infected plant debris and avoiding overhead watering.",
                ),
            ),
            (
                ClassLabel::AppleCedarRust,
                AdvisoryRecord::new(
                    "Prune affected parts and use fungicides as a preventive measure.",
                    "Prevent by removing nearby cedar trees and planting resistant apple varieties.",
                ),
            ),
            (
                ClassLabel::PotatoEarlyBlight,
                AdvisoryRecord::new(
                    "Use fungicides and practice crop rotation to manage this disease.",
                    "Prevention includes avoiding dense planting and ensuring proper air circulation.",
                ),
            ),
            (
                ClassLabel::PotatoLateBlight,
                AdvisoryRecord::new(
                    "Apply fungicides promptly and ensure good drainage in fields.",
                    "Prevention includes using resistant varieties and removing infected plant debris.",
                ),
            ),
            (
                ClassLabel::TomatoBacterialSpot,
                AdvisoryRecord::new(
                    "Remove affected plants, use resistant varieties, and apply bactericides.",
                    "Prevention includes proper crop rotation and avoiding overhead watering.",
                ),
            ),
            (
                ClassLabel::TomatoEarlyBlight,
                AdvisoryRecord::new(
                    "Use resistant varieties, rotate crops, and apply fungicides.",
                    "Prevention includes ensuring proper plant spacing and removing infected leaves.",
                ),
            ),
        ]);
        Self { entries }
    }

    /// An empty table: every diseased label reports no advisory
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Parse a JSON object keyed by label name.
    ///
    /// Unknown labels, healthy labels and blank texts are rejected so that a
    /// loaded entry always has non-empty treatment and prevention.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, AdvisoryRecord> =
            serde_json::from_str(json).context("Invalid advisory table")?;

        let mut entries = BTreeMap::new();
        for (name, record) in raw {
            let label = name.parse::<ClassLabel>().context("Invalid advisory table")?;
            if label.is_healthy() {
                return Err(DiagnosisError::Config(format!(
                    "advisory table has an entry for healthy label '{}'",
                    label
                )));
            }
            if record.treatment.trim().is_empty() || record.prevention.trim().is_empty() {
                return Err(DiagnosisError::Config(format!(
                    "advisory entry for '{}' has empty treatment or prevention text",
                    label
                )));
            }
            entries.insert(label, record);
        }
        Ok(Self { entries })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read advisory table {}", path.display()))?;
        Self::from_json_str(&content)
    }

    /// Built-in table, or the file at `path` when one is configured
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let table = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::builtin(),
        };
        for label in table.uncovered_labels() {
            warn!(label = %label, "No advisory entry for diseased label");
        }
        Ok(table)
    }

    pub fn get(&self, label: ClassLabel) -> Option<&AdvisoryRecord> {
        self.entries.get(&label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diseased labels the table has nothing for
    pub fn uncovered_labels(&self) -> Vec<ClassLabel> {
        ClassLabel::ALL
            .into_iter()
            .filter(|label| !label.is_healthy() && !self.entries.contains_key(label))
            .collect()
    }

    /// Derive the status message, link and advisory for a label
    pub fn diagnose(&self, label: ClassLabel) -> Diagnosis {
        let (plant_type, disease) = split_label(label.as_str());
        let plant_type = plant_type.to_string();

        if disease == HEALTHY {
            return Diagnosis {
                label,
                status_message: format!("The {} leaf is healthy!", plant_type),
                plant_type,
                disease,
                healthy: true,
                reference: None,
                advisory: AdvisoryStatus::Healthy,
            };
        }

        let advisory = match self.get(label) {
            Some(record) => AdvisoryStatus::Available(record.clone()),
            None => {
                warn!(label = %label, "No advisory available");
                AdvisoryStatus::Unavailable {
                    message: format!(
                        "No treatment or prevention advisory is available for {} {}.",
                        plant_type, disease
                    ),
                }
            }
        };

        Diagnosis {
            label,
            status_message: format!("Warning! This is a {} leaf with {}.", plant_type, disease),
            reference: Some(reference_link(&plant_type, &disease)),
            plant_type,
            disease,
            healthy: false,
            advisory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_scenario() {
        let diagnosis = AdvisoryTable::builtin().diagnose(ClassLabel::PotatoHealthy);

        assert_eq!(diagnosis.status_message, "The Potato leaf is healthy!");
        assert!(diagnosis.healthy);
        assert_eq!(diagnosis.reference, None);
        assert_eq!(diagnosis.advisory, AdvisoryStatus::Healthy);
    }

    #[test]
    fn test_apple_scab_scenario() {
        let diagnosis = AdvisoryTable::builtin().diagnose(ClassLabel::AppleScab);

        assert_eq!(
            diagnosis.status_message,
            "Warning! This is a Apple leaf with Apple scab."
        );
        let link = diagnosis.reference.unwrap();
        assert_eq!(link.url, "https://en.wikipedia.org/wiki/Apple-scab");
        assert_eq!(link.text, "Click here to learn more about Apple and Apple scab");
        match diagnosis.advisory {
            AdvisoryStatus::Available(record) => {
                assert!(record.treatment.starts_with("Treatment includes removing"));
                assert!(record.prevention.starts_with("Prevention includes planting"));
            }
            other => panic!("expected advisory, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_covers_every_diseased_label_with_text() {
        let table = AdvisoryTable::builtin();
        assert!(table.uncovered_labels().is_empty());

        for label in ClassLabel::ALL.into_iter().filter(|l| !l.is_healthy()) {
            let record = table.get(label).unwrap();
            assert!(!record.treatment.is_empty());
            assert!(!record.prevention.is_empty());
        }
    }

    #[test]
    fn test_healthy_labels_never_get_links_or_advice() {
        let table = AdvisoryTable::builtin();
        for label in ClassLabel::ALL.into_iter().filter(|l| l.is_healthy()) {
            let diagnosis = table.diagnose(label);
            assert_eq!(diagnosis.reference, None);
            assert_eq!(diagnosis.advisory, AdvisoryStatus::Healthy);
        }
    }

    #[test]
    fn test_missing_entry_is_explicit() {
        let diagnosis = AdvisoryTable::empty().diagnose(ClassLabel::TomatoBacterialSpot);

        assert!(!diagnosis.healthy);
        assert!(diagnosis.reference.is_some());
        assert_eq!(
            diagnosis.advisory,
            AdvisoryStatus::Unavailable {
                message: "No treatment or prevention advisory is available for Tomato Bacterial spot."
                    .to_string()
            }
        );
    }

    #[test]
    fn test_reference_link_dashes() {
        let link = reference_link("Tomato", "Bacterial spot");
        assert_eq!(link.url, "https://en.wikipedia.org/wiki/Bacterial-spot");
    }

    #[test]
    fn test_json_table_loading() {
        let table = AdvisoryTable::from_json_str(
            r#"{ "Apple_Black rot": { "treatment": "Prune.", "prevention": "Clean up." } }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(ClassLabel::AppleBlackRot).unwrap().treatment, "Prune.");
        assert_eq!(table.uncovered_labels().len(), 6);
    }

    #[test]
    fn test_json_table_rejects_bad_entries() {
        let unknown = r#"{ "Grape_Black rot": { "treatment": "a", "prevention": "b" } }"#;
        let healthy = r#"{ "Apple_healthy": { "treatment": "a", "prevention": "b" } }"#;
        let blank = r#"{ "Apple_Black rot": { "treatment": " ", "prevention": "b" } }"#;

        for json in [unknown, healthy, blank] {
            assert!(matches!(
                AdvisoryTable::from_json_str(json),
                Err(DiagnosisError::Config(_))
            ));
        }
    }
}
