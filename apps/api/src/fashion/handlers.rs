use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::fashion::pipeline::{FashionSetup, MainFrameOptions};
use crate::models::task::{ContentTask, FrameKey};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveFrameRequest {
    #[serde(default = "default_frame")]
    pub frame_type: FrameKey,
}

fn default_frame() -> FrameKey {
    FrameKey::Main
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AngleFramesRequest {
    #[serde(default)]
    pub base_prompt: Option<String>,
}

/// PATCH /api/tasks/:id/fashion/setup
pub async fn handle_fashion_setup(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(setup): Json<FashionSetup>,
) -> Result<Json<ContentTask>, AppError> {
    let task = state.frame_pipeline().configure(task_id, setup).await?;
    Ok(Json(task))
}

/// POST /api/tasks/:id/fashion/generate-main-frame
///
/// Runs synchronously; the provider call can take up to two minutes.
pub async fn handle_generate_main_frame(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(options): Json<MainFrameOptions>,
) -> Result<Json<ContentTask>, AppError> {
    let task = state
        .frame_pipeline()
        .generate_main_frame(task_id, options)
        .await?;
    Ok(Json(task))
}

/// POST /api/tasks/:id/fashion/approve-frame
pub async fn handle_approve_frame(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<ApproveFrameRequest>,
) -> Result<Json<ContentTask>, AppError> {
    let task = state
        .frame_pipeline()
        .approve_frame(task_id, req.frame_type)
        .await?;
    Ok(Json(task))
}

/// POST /api/tasks/:id/fashion/generate-additional-frames
pub async fn handle_generate_angle_frames(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AngleFramesRequest>,
) -> Result<Json<ContentTask>, AppError> {
    let task = state
        .frame_pipeline()
        .generate_angle_frames(task_id, req.base_prompt)
        .await?;
    Ok(Json(task))
}
