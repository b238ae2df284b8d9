//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::constants::APP_VERSION;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    /// Whether the Gradio Space answered its config probe
    remote: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let remote = state.client.health_check().await;

    Json(HealthResponse {
        status: if remote { "healthy" } else { "degraded" },
        version: APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        remote,
    })
}
