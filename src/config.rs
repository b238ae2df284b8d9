//! Configuration module

use std::env;

use crate::constants;
use crate::inference::InferenceConfig;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Largest accepted upload body
    pub max_upload_bytes: usize,

    /// Remote Space settings
    pub inference: InferenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_PORT,
            environment: "development".to_string(),
            max_upload_bytes: constants::DEFAULT_MAX_UPLOAD_BYTES,
            inference: InferenceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(constants::DEFAULT_PORT),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(constants::DEFAULT_MAX_UPLOAD_BYTES),

            inference: InferenceConfig::from_env(),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
