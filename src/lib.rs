//! Phoenix Inference
//!
//! Client for the Phoenix cervical-cell classification Space, plus the HTTP
//! gateway that serves its normalized results to the web front-end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  multipart   ┌────────────────────┐  Gradio REST  ┌──────────────┐
//! │  Front-end   │ ───────────▶ │  Gateway (Axum)    │ ────────────▶ │ Gradio Space │
//! │              │ ◀─────────── │  InferenceClient   │ ◀──────────── │  (HF hosted) │
//! └──────────────┘  JSON        └────────────────────┘  SSE outputs  └──────────────┘
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod inference;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};
use inference::InferenceClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<InferenceClient>,
    pub config: config::Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let predict_routes = Router::new()
        .route("/api/v1/predict", post(handlers::predict::basic))
        .route("/api/v1/predict/explain", post(handlers::predict::explain))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/endpoints", get(handlers::endpoints::list))
        .merge(predict_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
