use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::bloggers::wardrobe::{self, GeneratedImage, OutfitGenerateRequest};
use crate::errors::AppError;
use crate::models::blogger::{Blogger, BloggerDraft, Location, Outfit};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct LocationGenerateRequest {
    pub prompt: String,
}

fn validate_draft(draft: &BloggerDraft) -> Result<(), AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Bloggers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/bloggers
pub async fn handle_list_bloggers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Blogger>>, AppError> {
    Ok(Json(state.store.list_bloggers().await?))
}

/// POST /api/bloggers
pub async fn handle_create_blogger(
    State(state): State<AppState>,
    Json(draft): Json<BloggerDraft>,
) -> Result<(StatusCode, Json<Blogger>), AppError> {
    validate_draft(&draft)?;
    let blogger = Blogger::from_draft(draft);
    state.store.insert_blogger(&blogger).await?;
    info!("Created {} blogger {} ({})", blogger.kind.as_str(), blogger.name, blogger.id);
    Ok((StatusCode::CREATED, Json(blogger)))
}

/// GET /api/bloggers/:id
pub async fn handle_get_blogger(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
) -> Result<Json<Blogger>, AppError> {
    Ok(Json(store::require_blogger(state.store.as_ref(), blogger_id).await?))
}

/// PUT /api/bloggers/:id
pub async fn handle_update_blogger(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
    Json(draft): Json<BloggerDraft>,
) -> Result<Json<Blogger>, AppError> {
    validate_draft(&draft)?;
    let mut blogger = store::require_blogger(state.store.as_ref(), blogger_id).await?;
    blogger.apply_draft(draft);
    state.store.save_blogger(&blogger).await?;
    Ok(Json(blogger))
}

/// DELETE /api/bloggers/:id
/// Removes the blogger and all of its tasks.
pub async fn handle_delete_blogger(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_blogger(blogger_id).await? {
        return Err(AppError::NotFound(format!("Blogger {blogger_id} not found")));
    }
    info!("Deleted blogger {blogger_id}");
    Ok(Json(json!({ "ok": true })))
}

// ────────────────────────────────────────────────────────────────────────────
// Locations & outfits
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/bloggers/:id/locations
pub async fn handle_add_location(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
    Json(location): Json<Location>,
) -> Result<Json<Blogger>, AppError> {
    let blogger = wardrobe::add_location(state.store.as_ref(), blogger_id, location).await?;
    Ok(Json(blogger))
}

/// DELETE /api/bloggers/:id/locations/:index
pub async fn handle_remove_location(
    State(state): State<AppState>,
    Path((blogger_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Blogger>, AppError> {
    let blogger = wardrobe::remove_location(state.store.as_ref(), blogger_id, index).await?;
    Ok(Json(blogger))
}

/// POST /api/bloggers/:id/outfits
pub async fn handle_add_outfit(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
    Json(outfit): Json<Outfit>,
) -> Result<Json<Blogger>, AppError> {
    let blogger = wardrobe::add_outfit(state.store.as_ref(), blogger_id, outfit).await?;
    Ok(Json(blogger))
}

/// DELETE /api/bloggers/:id/outfits/:index
pub async fn handle_remove_outfit(
    State(state): State<AppState>,
    Path((blogger_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Blogger>, AppError> {
    let blogger = wardrobe::remove_outfit(state.store.as_ref(), blogger_id, index).await?;
    Ok(Json(blogger))
}

/// POST /api/bloggers/:id/locations/generate
pub async fn handle_generate_location(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
    Json(req): Json<LocationGenerateRequest>,
) -> Result<Json<GeneratedImage>, AppError> {
    let generated = wardrobe::generate_location_image(
        state.store.as_ref(),
        state.images.as_ref(),
        state.mirror.as_ref(),
        blogger_id,
        &req.prompt,
    )
    .await?;
    Ok(Json(generated))
}

/// POST /api/bloggers/:id/outfits/generate
pub async fn handle_generate_outfit(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
    Json(req): Json<OutfitGenerateRequest>,
) -> Result<Json<GeneratedImage>, AppError> {
    let generated = wardrobe::generate_outfit_image(
        state.store.as_ref(),
        state.images.as_ref(),
        state.mirror.as_ref(),
        blogger_id,
        &req,
    )
    .await?;
    Ok(Json(generated))
}
