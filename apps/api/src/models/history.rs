//! Append-only side tables of a task: AI styling suggestions and content versions.
//! Rows are inserted, never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Styling / location / weather recommendations for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSuggestion {
    #[serde(default)]
    pub outfit: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskMeta {
    pub id: Uuid,
    pub task_id: Uuid,
    pub data: Json<MetaSuggestion>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    User,
    Ai,
}

impl VersionSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            VersionSource::User => "user",
            VersionSource::Ai => "ai",
        }
    }
}

/// Snapshot of a task's idea and script after one content write.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskVersion {
    pub id: Uuid,
    pub task_id: Uuid,
    pub version: i32,
    pub idea: Option<String>,
    pub script: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}
