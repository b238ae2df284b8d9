//! Remote Inference Client
//!
//! Client for the Phoenix Gradio Space. Every operation opens its own
//! connection so a Space that restarted between calls is picked up again.

use std::time::Duration;

use super::connection::Connection;
use super::error::{InferenceError, InferenceResult};
use super::parse;
use super::types::{ApiInfo, ExplainabilityResult, ImageUpload, PredictionResult};
use crate::constants;

/// Remote service configuration
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    /// Transport timeout; `None` leaves reqwest's default in place
    pub timeout: Option<Duration>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::new(constants::DEFAULT_SPACE_URL)
    }
}

impl InferenceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// Read `HF_SPACE_URL` / `HF_TIMEOUT_SECONDS` with fallbacks
    pub fn from_env() -> Self {
        let config = Self::new(constants::get_space_url());
        match constants::get_timeout_seconds() {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Remote inference client
pub struct InferenceClient {
    config: InferenceConfig,
    http_client: reqwest::Client,
}

impl InferenceClient {
    /// Create new inference client
    pub fn new(config: InferenceConfig) -> InferenceResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| InferenceError::ConnectionFailure {
            base_url: config.base_url.clone(),
            reason: format!("failed to create HTTP client: {}", e),
        })?;

        Ok(Self { config, http_client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn connect(&self) -> InferenceResult<Connection<'_>> {
        Connection::open(&self.http_client, &self.config.base_url).await
    }

    /// Classify an image with `/predict_basic`
    pub async fn predict_basic(&self, image: ImageUpload) -> InferenceResult<PredictionResult> {
        tracing::info!("Sending prediction request (basic mode) to {}", self.config.base_url);

        let connection = self.connect().await?;
        let outputs = connection
            .predict_image(constants::PREDICT_BASIC_ENDPOINT, &image)
            .await?;

        tracing::debug!("Response data: {}", outputs);

        let result = parse::basic_prediction(&outputs)?;

        if let Some(top) = result.top() {
            tracing::info!(
                "Prediction: {} ({:.4}, {} classes)",
                top.label,
                top.confidence,
                result.confidences.len()
            );
        } else {
            tracing::warn!("Prediction returned no classes");
        }
        Ok(result)
    }

    /// Classify an image and fetch its Grad-CAM / Grad-CAM++ / LayerCAM heatmaps
    pub async fn predict_with_explainability(&self, image: ImageUpload) -> InferenceResult<ExplainabilityResult> {
        tracing::info!("Sending explainability request to {}", self.config.base_url);

        let connection = self.connect().await?;

        match connection.view_api().await {
            Ok(info) => tracing::debug!("Available Gradio API endpoints: {:?}", info.endpoint_names()),
            Err(e) => tracing::debug!("Could not fetch API info: {}", e),
        }

        let outputs = connection
            .predict_image(constants::PREDICT_EXPLAIN_ENDPOINT, &image)
            .await?;

        tracing::debug!("Response data: {}", outputs);

        let result = parse::explainability_result(&outputs, connection.base_url())?;

        tracing::info!(
            "Explainability prediction: {} (gradcam: {}, gradcam++: {}, layercam: {})",
            if result.probabilities.label.is_empty() { "<unparsed>" } else { result.probabilities.label.as_str() },
            !result.gradcam_image.is_empty(),
            !result.gradcam_plus_plus_image.is_empty(),
            !result.layercam_image.is_empty()
        );
        Ok(result)
    }

    /// Endpoint catalogue of the Space
    pub async fn view_api(&self) -> InferenceResult<ApiInfo> {
        self.connect().await?.view_api().await
    }

    /// Probe the Space without running inference
    ///
    /// Never fails; a healthy result does not guarantee the next call succeeds.
    pub async fn health_check(&self) -> bool {
        match self.connect().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                false
            }
        }
    }
}
