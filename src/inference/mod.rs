//! Remote Inference Module
//!
//! This module handles:
//! - Connecting to the hosted Gradio Space
//! - Uploading images and invoking the prediction endpoints
//! - Normalizing label payloads and heatmap references

pub mod client;
pub mod connection;
pub mod error;
pub mod parse;
pub mod types;

pub use client::{InferenceClient, InferenceConfig};
pub use error::{InferenceError, InferenceResult};
pub use parse::ClassificationPayload;
pub use types::{ApiInfo, ConfidenceEntry, ExplainabilityResult, ImageUpload, PredictionResult};
