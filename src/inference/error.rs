//! Remote inference errors

use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// The service could not be reached at all
    #[error("Failed to connect to the inference service at {base_url}: {reason}")]
    ConnectionFailure { base_url: String, reason: String },

    /// The service is up but rejected the call (405/404)
    #[error("The inference service at {base_url} returned {status}. Please check if the Space is running and exposes the expected endpoints")]
    ServiceMisconfigured { base_url: String, status: u16 },

    /// The call completed but the payload could not be interpreted
    #[error("Invalid response format from the inference service: {0}")]
    MalformedResponse(String),

    /// Any other non-success status, or an error event from the remote app
    #[error("The inference service failed: {0}")]
    RemoteFailure(String),

    /// The upload itself could not be encoded
    #[error("Invalid image upload: {0}")]
    InvalidImage(String),
}

impl InferenceError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. })
    }
}
