//! Classification endpoint response and verdict selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ClassifyError;
use crate::config::PipelineConfig;

/// Scores for one detected face, keyed by class name.
///
/// The endpoint reports its top classes per face, e.g.
/// `{"yeskyoko": 0.85, "notkyoko": 0.15}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelScores(pub BTreeMap<String, f64>);

impl LabelScores {
    pub fn score(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }
}

impl<const N: usize> From<[(&str, f64); N]> for LabelScores {
    fn from(entries: [(&str, f64); N]) -> Self {
        Self(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Body returned by the classification endpoint.
///
/// Either `error` is set, or `labels` holds one record per detected face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelScores>,
    /// Number of faces the server found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<u32>,
    /// Size of the request body the server received, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ClassificationResponse {
    pub fn from_json(body: &str) -> Result<Self, ClassifyError> {
        serde_json::from_str(body).map_err(|e| ClassifyError::InvalidResponse(e.to_string()))
    }

    /// Pick the UI state for this response.
    ///
    /// An `error` field wins over any labels.
    pub fn verdict(&self, config: &PipelineConfig) -> Result<Verdict, ClassifyError> {
        match &self.error {
            Some(message) => Err(ClassifyError::Service(message.clone())),
            None => Ok(Verdict::from_labels(
                &self.labels,
                &config.score_label,
                config.threshold,
            )),
        }
    }
}

/// The three renderable outcomes of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    NoFaceDetected,
    Positive,
    Negative,
}

impl Verdict {
    /// Zero labels means no face; any label scoring at or above `threshold`
    /// under `key` is positive. A label without `key` never qualifies.
    pub fn from_labels(labels: &[LabelScores], key: &str, threshold: f64) -> Self {
        if labels.is_empty() {
            return Verdict::NoFaceDetected;
        }
        let hit = labels
            .iter()
            .filter_map(|label| label.score(key))
            .any(|score| score >= threshold);
        if hit {
            Verdict::Positive
        } else {
            Verdict::Negative
        }
    }

    /// Background image for the response area, if this verdict shows one.
    pub fn asset<'a>(&self, config: &'a PipelineConfig) -> Option<&'a str> {
        match self {
            Verdict::Positive => Some(&config.positive_asset),
            Verdict::Negative => Some(&config.negative_asset),
            Verdict::NoFaceDetected => None,
        }
    }
}
