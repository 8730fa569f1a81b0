use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::Job;
use crate::planning::plan::{count_scheduled, month_dates};
use crate::planning::weekly::{build_weekly_pattern, WeeklyPattern};
use crate::state::AppState;
use crate::store;

#[derive(Debug, Deserialize)]
pub struct MonthlyPlanRequest {
    pub blogger_id: Uuid,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize)]
pub struct MonthlyPlanResponse {
    pub queued: bool,
    pub job_id: Uuid,
    pub blogger_id: Uuid,
    /// Tasks the job will create.
    pub tasks_planned: usize,
}

/// POST /api/plans/monthly
pub async fn handle_plan_month(
    State(state): State<AppState>,
    Json(req): Json<MonthlyPlanRequest>,
) -> Result<(StatusCode, Json<MonthlyPlanResponse>), AppError> {
    let blogger = store::require_blogger(state.store.as_ref(), req.blogger_id).await?;
    let dates = month_dates(req.year, req.month);
    if dates.is_empty() {
        return Err(AppError::Validation(format!(
            "{}-{} is not a valid month",
            req.year, req.month
        )));
    }

    let pattern = build_weekly_pattern(&blogger.content_frequency);
    let tasks_planned = count_scheduled(&pattern, &dates);

    let job_id = state
        .jobs
        .enqueue(Job::PlanMonth {
            blogger_id: blogger.id,
            year: req.year,
            month: req.month,
        })
        .await?;

    info!(
        "Queued month plan {}-{:02} for blogger {} ({tasks_planned} tasks)",
        req.year, req.month, blogger.id
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(MonthlyPlanResponse {
            queued: true,
            job_id,
            blogger_id: blogger.id,
            tasks_planned,
        }),
    ))
}

/// GET /api/bloggers/:id/pattern
pub async fn handle_weekly_pattern(
    State(state): State<AppState>,
    Path(blogger_id): Path<Uuid>,
) -> Result<Json<WeeklyPattern>, AppError> {
    let blogger = store::require_blogger(state.store.as_ref(), blogger_id).await?;
    Ok(Json(build_weekly_pattern(&blogger.content_frequency)))
}
