//! Central Configuration Constants
//!
//! Single source of truth for the remote service defaults and the
//! Gradio conventions this crate depends on.

/// Default Hugging Face Space URL
///
/// Used when neither `HF_SPACE_URL` nor `NEXT_PUBLIC_HF_SPACE_URL` is set.
pub const DEFAULT_SPACE_URL: &str = "https://meet2304-project-phoenix-cervical-classification.hf.space";

/// Endpoint returning the label mapping only
pub const PREDICT_BASIC_ENDPOINT: &str = "/predict_basic";

/// Endpoint returning the label mapping, three CAM heatmaps and an info string
pub const PREDICT_EXPLAIN_ENDPOINT: &str = "/predict_with_explainability";

/// Load-balancer segment that must not appear in file URLs
pub const REPLICA_MARKER: &str = "/--replicas/";

/// Gradio static/temp file route
pub const FILE_ROUTE: &str = "/file=";

/// Upload defaults when the caller gives no name or type
pub const DEFAULT_FILENAME: &str = "image.png";
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Gateway defaults
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get the Space URL from environment or use default
///
/// `NEXT_PUBLIC_HF_SPACE_URL` is accepted so the front-end's `.env` files work unchanged.
pub fn get_space_url() -> String {
    ["HF_SPACE_URL", "NEXT_PUBLIC_HF_SPACE_URL"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SPACE_URL.to_string())
}

/// Get the optional transport timeout (seconds) from environment
pub fn get_timeout_seconds() -> Option<u64> {
    std::env::var("HF_TIMEOUT_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
}
