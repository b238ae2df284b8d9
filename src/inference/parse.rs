//! Response Normalization
//!
//! The Space's Label output does not have a single stable shape. Depending on
//! the Gradio version and how the endpoint is wired it arrives as:
//!
//! ```text
//! Entries : { "label": "Dyskeratotic", "confidences": [{ "label": ..., "confidence": 0.87 }, ...] }
//! Nested  : { "label": { "Dyskeratotic": 0.87, ... } }
//! Flat    : { "Dyskeratotic": 0.87, "Koilocytotic": 0.05, ... }
//! ```
//!
//! Shapes are tried in that order; anything else is `Unparsed` and yields an
//! empty [`PredictionResult`] instead of an error.

use serde_json::{Map, Value};

use super::error::{InferenceError, InferenceResult};
use super::types::{ConfidenceEntry, ExplainabilityResult, PredictionResult};
use crate::constants::{FILE_ROUTE, REPLICA_MARKER};

/// Number of positional outputs of the explainability endpoint
pub const EXPLAIN_OUTPUT_COUNT: usize = 5;

// ============================================================================
// CLASSIFICATION PAYLOAD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassificationPayload<'a> {
    Entries(&'a [Value]),
    Nested(&'a Map<String, Value>),
    Flat(&'a Map<String, Value>),
    Unparsed,
}

impl<'a> ClassificationPayload<'a> {
    pub fn parse(value: &'a Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Unparsed;
        };

        match (object.get("label"), object.get("confidences")) {
            (Some(_), Some(Value::Array(entries))) => Self::Entries(entries),
            (Some(Value::Object(nested)), _) => Self::Nested(nested),
            _ => Self::Flat(object),
        }
    }

    pub fn normalize(self) -> PredictionResult {
        let entries = match self {
            Self::Entries(items) => items.iter().filter_map(entry_from_item).collect(),
            Self::Nested(map) | Self::Flat(map) => entries_from_map(map),
            Self::Unparsed => Vec::new(),
        };

        PredictionResult::from_entries(entries)
    }
}

fn entry_from_item(item: &Value) -> Option<ConfidenceEntry> {
    let label = item.get("label")?.as_str()?;
    let confidence = coerce_confidence(item.get("confidence")?)?;

    Some(ConfidenceEntry {
        label: label.to_string(),
        confidence,
    })
}

fn entries_from_map(map: &Map<String, Value>) -> Vec<ConfidenceEntry> {
    map.iter()
        .filter_map(|(label, value)| {
            coerce_confidence(value).map(|confidence| ConfidenceEntry {
                label: label.clone(),
                confidence,
            })
        })
        .collect()
}

/// Coerce a confidence to a finite number in `[0, 1]`
///
/// Accepts numbers, numeric strings, and objects carrying a `confidence` field.
pub fn coerce_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(map) => map.get("confidence").and_then(coerce_confidence),
        _ => None,
    }?;

    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}

// ============================================================================
// ENDPOINT OUTPUTS
// ============================================================================

/// Normalize the `/predict_basic` output
///
/// The label mapping is either the first element of the output list or the
/// payload itself. Anything that is not an object is rejected.
pub fn basic_prediction(outputs: &Value) -> InferenceResult<PredictionResult> {
    let payload = match outputs {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| InferenceError::MalformedResponse("empty output list".to_string()))?,
        other => other,
    };

    if !payload.is_object() {
        return Err(InferenceError::MalformedResponse(format!(
            "expected a label mapping, got {}",
            describe(payload)
        )));
    }

    Ok(ClassificationPayload::parse(payload).normalize())
}

/// Normalize the `/predict_with_explainability` output
///
/// Only a missing output list is an error. Each part is parsed independently
/// so the heatmaps survive an unreadable label payload and vice versa.
pub fn explainability_result(outputs: &Value, base_url: &str) -> InferenceResult<ExplainabilityResult> {
    let items = outputs
        .as_array()
        .filter(|items| items.len() >= EXPLAIN_OUTPUT_COUNT)
        .ok_or_else(|| {
            InferenceError::MalformedResponse(format!(
                "expected {} outputs, got {}",
                EXPLAIN_OUTPUT_COUNT,
                describe(outputs)
            ))
        })?;

    let probabilities = ClassificationPayload::parse(&items[0]).normalize();
    if probabilities.is_empty() {
        tracing::warn!("Could not parse class probabilities, returning heatmaps only");
    }

    Ok(ExplainabilityResult {
        probabilities,
        gradcam_image: resolve_image_url(&items[1], base_url),
        gradcam_plus_plus_image: resolve_image_url(&items[2], base_url),
        layercam_image: resolve_image_url(&items[3], base_url),
        info: items[4].as_str().unwrap_or_default().to_string(),
    })
}

// ============================================================================
// IMAGE REFERENCES
// ============================================================================

/// Turn an Image output into a fetchable URL, or `""` if it carries none
pub fn resolve_image_url(value: &Value, base_url: &str) -> String {
    match value {
        Value::Object(map) => {
            let path = map
                .get("path")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty());

            match path {
                Some(path) => file_url(base_url, path),
                None => map
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        }
        Value::String(s) if s.starts_with('/') => file_url(base_url, s),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// `<base without replica suffix>/file=<path>`
pub fn file_url(base_url: &str, path: &str) -> String {
    format!("{}{}{}", strip_replica_suffix(base_url), FILE_ROUTE, path)
}

/// Drop the load-balancer `/--replicas/...` segment and any trailing slash
pub fn strip_replica_suffix(base_url: &str) -> &str {
    let base = match base_url.find(REPLICA_MARKER) {
        Some(idx) => &base_url[..idx],
        None => base_url,
    };
    base.trim_end_matches('/')
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://host.hf.space";

    fn labels(result: &PredictionResult) -> Vec<&str> {
        result.confidences.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn test_basic_sipakmed_scenario() {
        let outputs = json!([{
            "Dyskeratotic": 0.87,
            "Koilocytotic": 0.05,
            "Metaplastic": 0.03,
            "Parabasal": 0.03,
            "Superficial-Intermediate": 0.02
        }]);

        let result = basic_prediction(&outputs).unwrap();

        assert_eq!(result.label, "Dyskeratotic");
        assert_eq!(result.confidences.len(), 5);
        assert!((result.confidences[0].confidence - 0.87).abs() < f64::EPSILON);
        assert!(result
            .confidences
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
        // tie keeps key order
        assert_eq!(result.confidences[2].label, "Metaplastic");
        assert_eq!(result.confidences[3].label, "Parabasal");
    }

    #[test]
    fn test_basic_unwrapped_mapping() {
        let result = basic_prediction(&json!({ "Parabasal": 0.4, "Metaplastic": 0.6 })).unwrap();
        assert_eq!(result.label, "Metaplastic");
        assert_eq!(labels(&result), vec!["Metaplastic", "Parabasal"]);
    }

    #[test]
    fn test_basic_rejects_non_objects() {
        for payload in [json!("Dyskeratotic"), json!(0.87), json!(null), json!(["x"]), json!([])] {
            let err = basic_prediction(&payload).unwrap_err();
            assert!(
                matches!(err, InferenceError::MalformedResponse(_)),
                "payload {payload} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_basic_empty_mapping() {
        let result = basic_prediction(&json!([{}])).unwrap();
        assert_eq!(result, PredictionResult::default());
    }

    #[test]
    fn test_formats_are_equivalent() {
        let entries = json!({
            "label": "Koilocytotic",
            "confidences": [
                { "label": "Parabasal", "confidence": "0.1" },
                { "label": "Koilocytotic", "confidence": 0.6 },
                { "label": "Metaplastic", "confidence": 0.3 }
            ]
        });
        let nested = json!({
            "label": { "Parabasal": 0.1, "Koilocytotic": 0.6, "Metaplastic": 0.3 }
        });
        let flat = json!({ "Parabasal": 0.1, "Koilocytotic": 0.6, "Metaplastic": 0.3 });

        assert!(matches!(ClassificationPayload::parse(&entries), ClassificationPayload::Entries(_)));
        assert!(matches!(ClassificationPayload::parse(&nested), ClassificationPayload::Nested(_)));
        assert!(matches!(ClassificationPayload::parse(&flat), ClassificationPayload::Flat(_)));

        let a = ClassificationPayload::parse(&entries).normalize();
        let b = ClassificationPayload::parse(&nested).normalize();
        let c = ClassificationPayload::parse(&flat).normalize();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.label, "Koilocytotic");
        assert_eq!(labels(&a), vec!["Koilocytotic", "Metaplastic", "Parabasal"]);
    }

    #[test]
    fn test_scalar_label_falls_through_to_flat() {
        let payload = json!({ "label": "Dyskeratotic" });
        assert!(matches!(ClassificationPayload::parse(&payload), ClassificationPayload::Flat(_)));
        assert!(ClassificationPayload::parse(&payload).normalize().is_empty());
    }

    #[test]
    fn test_unparsed_payloads() {
        for payload in [json!(null), json!("x"), json!(3), json!([1, 2])] {
            assert_eq!(ClassificationPayload::parse(&payload), ClassificationPayload::Unparsed);
            assert_eq!(
                ClassificationPayload::parse(&payload).normalize(),
                PredictionResult::default()
            );
        }
    }

    #[test]
    fn test_coerce_confidence() {
        assert_eq!(coerce_confidence(&json!(0.25)), Some(0.25));
        assert_eq!(coerce_confidence(&json!(" 0.5 ")), Some(0.5));
        assert_eq!(coerce_confidence(&json!({ "confidence": "0.75" })), Some(0.75));
        assert_eq!(coerce_confidence(&json!(1.5)), Some(1.0));
        assert_eq!(coerce_confidence(&json!(-0.2)), Some(0.0));
        assert_eq!(coerce_confidence(&json!("NaN")), None);
        assert_eq!(coerce_confidence(&json!("high")), None);
        assert_eq!(coerce_confidence(&json!(null)), None);
        assert_eq!(coerce_confidence(&json!([0.3])), None);
    }

    #[test]
    fn test_entries_skip_unreadable_items() {
        let payload = json!({
            "label": "Parabasal",
            "confidences": [
                { "label": "Parabasal", "confidence": 0.9 },
                { "label": "Metaplastic", "confidence": "n/a" },
                { "confidence": 0.1 },
                "garbage"
            ]
        });
        let result = ClassificationPayload::parse(&payload).normalize();
        assert_eq!(labels(&result), vec!["Parabasal"]);
    }

    #[test]
    fn test_resolve_absolute_url_unchanged() {
        let url = "https://cdn.example.com/heatmaps/gradcam.png";
        assert_eq!(resolve_image_url(&json!(url), BASE), url);
    }

    #[test]
    fn test_resolve_strips_replica_suffix() {
        let base = "https://host.hf.space/--replicas/abc123";
        assert_eq!(
            resolve_image_url(&json!({ "path": "/tmp/gradcam.png" }), base),
            "https://host.hf.space/file=/tmp/gradcam.png"
        );
        assert_eq!(
            resolve_image_url(&json!("/tmp/gradcam.png"), base),
            "https://host.hf.space/file=/tmp/gradcam.png"
        );
    }

    #[test]
    fn test_resolve_object_variants() {
        assert_eq!(
            resolve_image_url(&json!({ "path": "", "url": "https://host.hf.space/file=/x.png" }), BASE),
            "https://host.hf.space/file=/x.png"
        );
        assert_eq!(resolve_image_url(&json!({ "orig_name": "x.png" }), BASE), "");
        assert_eq!(resolve_image_url(&json!(null), BASE), "");
        assert_eq!(resolve_image_url(&json!(42), BASE), "");
    }

    #[test]
    fn test_strip_replica_suffix() {
        assert_eq!(strip_replica_suffix("https://host.hf.space/"), "https://host.hf.space");
        assert_eq!(strip_replica_suffix("https://host.hf.space/--replicas/x/y"), "https://host.hf.space");
        assert_eq!(strip_replica_suffix(BASE), BASE);
    }

    #[test]
    fn test_explainability_partial_result() {
        let outputs = json!([
            null,
            { "path": "/tmp/gradio/a/gradcam.png", "orig_name": "gradcam.png" },
            "/tmp/gradio/b/gradcam_pp.png",
            "https://elsewhere.example/layercam.png",
            "Predicted class: unknown"
        ]);

        let result = explainability_result(&outputs, BASE).unwrap();

        assert!(result.probabilities.confidences.is_empty());
        assert_eq!(result.probabilities.label, "");
        assert_eq!(result.gradcam_image, "https://host.hf.space/file=/tmp/gradio/a/gradcam.png");
        assert_eq!(result.gradcam_plus_plus_image, "https://host.hf.space/file=/tmp/gradio/b/gradcam_pp.png");
        assert_eq!(result.layercam_image, "https://elsewhere.example/layercam.png");
        assert_eq!(result.info, "Predicted class: unknown");
    }

    #[test]
    fn test_explainability_empty_object_and_missing_info() {
        let outputs = json!([{}, null, null, { "path": "/tmp/l.png" }, null]);
        let result = explainability_result(&outputs, BASE).unwrap();

        assert_eq!(result.probabilities, PredictionResult::default());
        assert_eq!(result.gradcam_image, "");
        assert_eq!(result.layercam_image, "https://host.hf.space/file=/tmp/l.png");
        assert_eq!(result.info, "");
    }

    #[test]
    fn test_explainability_requires_five_outputs() {
        for outputs in [json!([{ "A": 1.0 }, null, null, null]), json!({ "A": 1.0 }), json!(null)] {
            assert!(matches!(
                explainability_result(&outputs, BASE),
                Err(InferenceError::MalformedResponse(_))
            ));
        }
    }
}
