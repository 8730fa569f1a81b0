use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::assistant::meta::{generate_meta, latest_meta};
use crate::errors::AppError;
use crate::models::history::TaskMeta;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MetaRequest {
    pub task_id: Uuid,
}

/// POST /api/assistant/meta/generate
pub async fn handle_generate_meta(
    State(state): State<AppState>,
    Json(req): Json<MetaRequest>,
) -> Result<Json<TaskMeta>, AppError> {
    let meta = generate_meta(state.store.as_ref(), state.text.as_ref(), req.task_id).await?;
    Ok(Json(meta))
}

/// GET /api/assistant/meta/:task_id
pub async fn handle_latest_meta(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskMeta>, AppError> {
    Ok(Json(latest_meta(state.store.as_ref(), task_id).await?))
}
