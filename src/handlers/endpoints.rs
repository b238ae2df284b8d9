//! Remote endpoint catalogue handler

use axum::{extract::State, Json};

use crate::inference::ApiInfo;
use crate::{AppResult, AppState};

/// List the endpoints the Space exposes
pub async fn list(State(state): State<AppState>) -> AppResult<Json<ApiInfo>> {
    let info = state.client.view_api().await?;
    Ok(Json(info))
}
