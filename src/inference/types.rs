//! Inference Types
//!
//! Request and result shapes shared by the client and the gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_FILENAME, DEFAULT_MIME_TYPE};

// ============================================================================
// REQUEST
// ============================================================================

/// Image submitted for classification
///
/// The remote endpoint expects a named file upload, so a missing filename or
/// MIME type falls back to [`DEFAULT_FILENAME`] / [`DEFAULT_MIME_TYPE`].
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: None,
            mime_type: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Filename sent to the service
    pub fn file_name(&self) -> &str {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
    }

    /// MIME type sent to the service
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|mime| mime.contains('/'))
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// False when the caller named a non-image MIME type
    pub fn has_image_type(&self) -> bool {
        match self.mime_type.as_deref().map(str::trim) {
            Some(mime) if !mime.is_empty() => mime.starts_with("image/"),
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// One class probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEntry {
    pub label: String,
    pub confidence: f64,
}

/// Normalized classification
///
/// `confidences` is always sorted descending and `label` is the top entry's
/// label (empty when nothing could be parsed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub confidences: Vec<ConfidenceEntry>,
}

impl PredictionResult {
    pub fn from_entries(mut confidences: Vec<ConfidenceEntry>) -> Self {
        // sort_by is stable, so ties keep the service's key order
        confidences.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let label = confidences
            .first()
            .map(|top| top.label.clone())
            .unwrap_or_default();

        Self { label, confidences }
    }

    pub fn top(&self) -> Option<&ConfidenceEntry> {
        self.confidences.first()
    }

    pub fn is_empty(&self) -> bool {
        self.confidences.is_empty()
    }
}

/// Classification plus the three CAM heatmaps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainabilityResult {
    pub probabilities: PredictionResult,
    pub gradcam_image: String,
    pub gradcam_plus_plus_image: String,
    pub layercam_image: String,
    pub info: String,
}

/// Endpoint catalogue reported by the service's `/info` route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiInfo(pub Value);

impl ApiInfo {
    /// Names of the endpoints exposed with an `api_name`
    pub fn endpoint_names(&self) -> Vec<String> {
        self.0
            .get("named_endpoints")
            .and_then(Value::as_object)
            .map(|endpoints| endpoints.keys().cloned().collect())
            .unwrap_or_default()
    }
}
