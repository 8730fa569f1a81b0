use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
}

/// POST /api/upload/image
/// Multipart form with a single `file` field holding an image.
pub async fn handle_upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation("File must be an image".to_string()));
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;

        let key = format!("bloggers/{}.{}", Uuid::new_v4(), extension(&filename));
        let url = state.storage.store(data, &key, &content_type).await?;

        info!("Uploaded {filename} as {key}");
        return Ok(Json(UploadResponse { url, filename }));
    }

    Err(AppError::Validation("Missing 'file' field".to_string()))
}

fn extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => "jpg",
    }
}
