use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::history::{TaskVersion, VersionSource};
use crate::models::task::{ContentTask, NewTask};
use crate::state::AppState;
use crate::store;
use crate::tasks::content::{generate_script, write_content, ContentUpdate, ScriptResult};
use crate::tasks::generation::{dispatch_asset_generation, DispatchReceipt, GenerateRequest};
use crate::tasks::{transition, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub blogger_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct VersionHistory {
    pub task_id: Uuid,
    pub versions: Vec<TaskVersion>,
}

/// GET /api/tasks
pub async fn handle_list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListQuery>,
) -> Result<Json<Vec<ContentTask>>, AppError> {
    Ok(Json(state.store.list_tasks(params.blogger_id).await?))
}

/// GET /api/tasks/:id
pub async fn handle_get_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ContentTask>, AppError> {
    Ok(Json(store::require_task(state.store.as_ref(), task_id).await?))
}

/// POST /api/tasks
///
/// New tasks start in DRAFT or PLANNED; every later status is reached
/// through an action.
pub async fn handle_create_task(
    State(state): State<AppState>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<ContentTask>), AppError> {
    if !matches!(new.status, TaskStatus::Draft | TaskStatus::Planned) {
        return Err(AppError::Validation(format!(
            "A new task cannot start in {}",
            new.status
        )));
    }
    if new.content_type.trim().is_empty() {
        return Err(AppError::Validation("content_type is required".to_string()));
    }
    store::require_blogger(state.store.as_ref(), new.blogger_id).await?;

    let task = state.store.create_task(&new).await?;
    info!("Created task {} for blogger {} on {}", task.id, task.blogger_id, task.date);
    Ok((StatusCode::CREATED, Json(task)))
}

/// DELETE /api/tasks/:id
pub async fn handle_delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_task(task_id).await? {
        return Err(AppError::NotFound(format!("Task {task_id} not found")));
    }
    Ok(Json(json!({ "ok": true })))
}

/// PUT /api/tasks/:id/status
///
/// Only statuses an operator may set by hand are accepted: DRAFT (reset) and
/// REVIEW (hand finished visuals over for review).
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<ContentTask>, AppError> {
    let target = TaskStatus::try_from(req.status.as_str())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let task = store::update_task(state.store.as_ref(), task_id, |task| {
        let event = TaskStatus::manual_event(target).ok_or(AppError::InvalidTransition {
            from: task.status,
            to: target,
        })?;
        transition(task, event)
    })
    .await?;

    info!("Task {task_id} manually moved to {}", task.status);
    Ok(Json(task))
}

/// PUT /api/tasks/:id/content
pub async fn handle_update_content(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<ContentTask>, AppError> {
    let task = write_content(state.store.as_ref(), task_id, update, VersionSource::User).await?;
    Ok(Json(task))
}

/// POST /api/tasks/:id/script
pub async fn handle_generate_script(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ScriptResult>, AppError> {
    let result = generate_script(state.store.as_ref(), state.text.as_ref(), task_id).await?;
    Ok(Json(result))
}

/// POST /api/tasks/:id/generate
pub async fn handle_generate_asset(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<DispatchReceipt>), AppError> {
    let receipt = dispatch_asset_generation(
        state.store.as_ref(),
        state.jobs.as_ref(),
        &state.asset_services(),
        task_id,
        req,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/tasks/:id/versions
pub async fn handle_task_versions(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<VersionHistory>, AppError> {
    store::require_task(state.store.as_ref(), task_id).await?;
    let versions = state.store.versions(task_id).await?;
    Ok(Json(VersionHistory { task_id, versions }))
}
