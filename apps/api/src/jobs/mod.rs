//! Background jobs: what can be queued, the Redis queue and the worker pool.
//!
//! Delivery is at-least-once with no ordering between jobs. A worker moves an
//! envelope onto a processing list and removes it only after the job has run;
//! whatever is left there when the process starts again is requeued. A job
//! delivered twice for a task that is no longer GENERATING is skipped.
//!
//! Failed jobs are not retried. The failure is logged and the task carries the
//! error, so the user re-triggers the action.

pub mod queue;
pub mod worker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tasks::generation::AssetKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    GenerateAsset {
        task_id: Uuid,
        asset: AssetKind,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        skip_review: bool,
    },
    PlanMonth {
        blogger_id: Uuid,
        year: i32,
        month: u32,
    },
}

impl Job {
    pub const fn name(&self) -> &'static str {
        match self {
            Job::GenerateAsset { .. } => "generate_asset",
            Job::PlanMonth { .. } => "plan_month",
        }
    }
}

/// What actually sits on the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: Uuid,
    pub job: Job,
    pub enqueued_at: DateTime<Utc>,
}

impl JobEnvelope {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            enqueued_at: Utc::now(),
        }
    }
}
