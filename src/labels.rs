//! Class labels produced by the leaf classifier
//!
//! The model emits a probability vector whose positions map, in order, onto
//! [`CLASS_NAMES`]. Each name has the form `"<Plant>_<Disease>"` or
//! `"<Plant>_healthy"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of classes the model was trained on
pub const NUM_CLASSES: usize = 10;

/// Separator between plant type and disease in a label
pub const LABEL_SEPARATOR: char = '_';

/// Disease part of every healthy label
pub const HEALTHY: &str = "healthy";

/// Class names, indexed by model output position
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "Apple_Apple scab",      // 0
    "Apple_Black rot",       // 1
    "Apple_Cedar rust",      // 2
    "Apple_healthy",         // 3
    "Potato_Early blight",   // 4
    "Potato_healthy",        // 5
    "Potato_Late blight",    // 6
    "Tomato_Bacterial spot", // 7
    "Tomato_Early blight",   // 8
    "Tomato_healthy",        // 9
];

/// One of the fixed classifier outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLabel {
    #[serde(rename = "Apple_Apple scab")]
    AppleScab,
    #[serde(rename = "Apple_Black rot")]
    AppleBlackRot,
    #[serde(rename = "Apple_Cedar rust")]
    AppleCedarRust,
    #[serde(rename = "Apple_healthy")]
    AppleHealthy,
    #[serde(rename = "Potato_Early blight")]
    PotatoEarlyBlight,
    #[serde(rename = "Potato_healthy")]
    PotatoHealthy,
    #[serde(rename = "Potato_Late blight")]
    PotatoLateBlight,
    #[serde(rename = "Tomato_Bacterial spot")]
    TomatoBacterialSpot,
    #[serde(rename = "Tomato_Early blight")]
    TomatoEarlyBlight,
    #[serde(rename = "Tomato_healthy")]
    TomatoHealthy,
}

/// A label string that is not one of [`CLASS_NAMES`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown class label '{0}'")]
pub struct UnknownLabelError(pub String);

impl ClassLabel {
    /// All labels in model output order
    pub const ALL: [ClassLabel; NUM_CLASSES] = [
        ClassLabel::AppleScab,
        ClassLabel::AppleBlackRot,
        ClassLabel::AppleCedarRust,
        ClassLabel::AppleHealthy,
        ClassLabel::PotatoEarlyBlight,
        ClassLabel::PotatoHealthy,
        ClassLabel::PotatoLateBlight,
        ClassLabel::TomatoBacterialSpot,
        ClassLabel::TomatoEarlyBlight,
        ClassLabel::TomatoHealthy,
    ];

    /// Model output position of this label
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label for a model output position
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        CLASS_NAMES[self.index()]
    }

    /// Substring before the first separator, e.g. `"Apple"`
    pub fn plant_type(self) -> &'static str {
        split_label(self.as_str()).0
    }

    /// Everything after the first separator, e.g. `"Apple scab"`
    pub fn disease(self) -> String {
        split_label(self.as_str()).1
    }

    pub fn is_healthy(self) -> bool {
        self.disease() == HEALTHY
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        class_index(s)
            .and_then(ClassLabel::from_index)
            .ok_or_else(|| UnknownLabelError(s.to_string()))
    }
}

/// Split a label into `(plant_type, disease)`.
///
/// The plant type is the text before the first separator; the disease is the
/// remaining parts joined back with the separator, so
/// `plant_type + "_" + disease` always reproduces a label that contains one.
pub fn split_label(label: &str) -> (&str, String) {
    let mut parts = label.split(LABEL_SEPARATOR);
    let plant_type = parts.next().unwrap_or_default();
    let disease = parts.collect::<Vec<_>>().join(&LABEL_SEPARATOR.to_string());
    (plant_type, disease)
}

/// Get the model output index for a given class name
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_NAMES.iter().position(|&n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_lossless_for_every_label() {
        for label in ClassLabel::ALL {
            let (plant, disease) = split_label(label.as_str());
            assert_eq!(format!("{}_{}", plant, disease), label.as_str());
        }
    }

    #[test]
    fn test_split_examples() {
        assert_eq!(split_label("Apple_Apple scab"), ("Apple", "Apple scab".to_string()));
        assert_eq!(split_label("Potato_healthy"), ("Potato", "healthy".to_string()));
        assert_eq!(split_label("Corn_Leaf_Blight"), ("Corn", "Leaf_Blight".to_string()));
        assert_eq!(split_label("Orphan"), ("Orphan", String::new()));
    }

    #[test]
    fn test_index_round_trip_matches_class_names() {
        for (i, name) in CLASS_NAMES.iter().enumerate() {
            let label = ClassLabel::from_index(i).unwrap();
            assert_eq!(label.index(), i);
            assert_eq!(label.as_str(), *name);
        }
        assert_eq!(ClassLabel::from_index(NUM_CLASSES), None);
    }

    #[test]
    fn test_healthy_labels() {
        let healthy: Vec<ClassLabel> = ClassLabel::ALL
            .iter()
            .copied()
            .filter(|l| l.is_healthy())
            .collect();
        assert_eq!(
            healthy,
            vec![
                ClassLabel::AppleHealthy,
                ClassLabel::PotatoHealthy,
                ClassLabel::TomatoHealthy
            ]
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "Tomato_Early blight".parse::<ClassLabel>(),
            Ok(ClassLabel::TomatoEarlyBlight)
        );
        assert!("Tomato___Early_blight".parse::<ClassLabel>().is_err());
    }

    #[test]
    fn test_serde_uses_label_names() {
        let json = serde_json::to_string(&ClassLabel::AppleCedarRust).unwrap();
        assert_eq!(json, "\"Apple_Cedar rust\"");
        let back: ClassLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClassLabel::AppleCedarRust);
    }
}
