//! Prediction handlers
//!
//! Both routes take a multipart form with the image in a part named `image`.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::inference::{ExplainabilityResult, ImageUpload, PredictionResult};
use crate::{AppError, AppResult, AppState};

/// Form field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Basic classification
pub async fn basic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<PredictionResult>> {
    let image = read_image(multipart).await?;
    let result = state.client.predict_basic(image).await?;
    Ok(Json(result))
}

/// Classification with CAM heatmaps
pub async fn explain(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ExplainabilityResult>> {
    let image = read_image(multipart).await?;
    let result = state.client.predict_with_explainability(image).await?;
    Ok(Json(result))
}

async fn read_image(mut multipart: Multipart) -> AppResult<ImageUpload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_owned);
        let mime_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;

        let image = ImageUpload {
            bytes: bytes.to_vec(),
            filename,
            mime_type,
        };

        if !image.has_image_type() {
            return Err(AppError::BadRequest(format!(
                "Unsupported file type '{}', please upload an image",
                image.mime_type.as_deref().unwrap_or_default()
            )));
        }
        if image.is_empty() {
            return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
        }

        return Ok(image);
    }

    Err(AppError::BadRequest(format!("Missing '{}' file field", IMAGE_FIELD)))
}
