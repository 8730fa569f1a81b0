//! Persistence port for bloggers, tasks and their append-only history.
//!
//! Core components (planning, state machine, fashion pipeline) only see
//! `dyn ContentStore`. `PgStore` backs the running service; `MemoryStore`
//! backs the unit tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::Blogger;
use crate::models::history::{MetaSuggestion, TaskMeta, TaskVersion, VersionSource};
use crate::models::task::{ContentTask, NewTask};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// Idea/script snapshot appended to a task's version history.
#[derive(Debug, Clone)]
pub struct VersionDraft {
    pub idea: Option<String>,
    pub script: Option<String>,
    pub source: VersionSource,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_bloggers(&self) -> Result<Vec<Blogger>, AppError>;
    async fn blogger(&self, id: Uuid) -> Result<Option<Blogger>, AppError>;
    async fn insert_blogger(&self, blogger: &Blogger) -> Result<(), AppError>;
    async fn save_blogger(&self, blogger: &Blogger) -> Result<(), AppError>;
    /// Deletes the blogger together with every task it owns.
    async fn delete_blogger(&self, id: Uuid) -> Result<bool, AppError>;

    /// Tasks ordered by date, optionally for one blogger.
    async fn list_tasks(&self, blogger_id: Option<Uuid>) -> Result<Vec<ContentTask>, AppError>;
    async fn task(&self, id: Uuid) -> Result<Option<ContentTask>, AppError>;
    async fn create_task(&self, new: &NewTask) -> Result<ContentTask, AppError>;
    /// Writes every mutable column of the task. One call is one commit.
    async fn save_task(&self, task: &ContentTask) -> Result<(), AppError>;
    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError>;

    async fn append_version(
        &self,
        task_id: Uuid,
        draft: &VersionDraft,
    ) -> Result<TaskVersion, AppError>;
    /// Oldest first.
    async fn versions(&self, task_id: Uuid) -> Result<Vec<TaskVersion>, AppError>;
    async fn append_meta(&self, task_id: Uuid, data: &MetaSuggestion)
        -> Result<TaskMeta, AppError>;
    async fn latest_meta(&self, task_id: Uuid) -> Result<Option<TaskMeta>, AppError>;
}

pub async fn require_task(store: &dyn ContentStore, id: Uuid) -> Result<ContentTask, AppError> {
    store
        .task(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {id} not found")))
}

pub async fn require_blogger(store: &dyn ContentStore, id: Uuid) -> Result<Blogger, AppError> {
    store
        .blogger(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Blogger {id} not found")))
}

/// Re-reads the task, applies `change` and commits it.
///
/// Reading immediately before the write keeps the window for clobbering a
/// concurrent writer small; it does not close it. If `change` fails nothing
/// is written.
pub async fn update_task<F>(
    store: &dyn ContentStore,
    id: Uuid,
    change: F,
) -> Result<ContentTask, AppError>
where
    F: FnOnce(&mut ContentTask) -> Result<(), AppError> + Send,
{
    let mut task = require_task(store, id).await?;
    change(&mut task)?;
    store.save_task(&task).await?;
    Ok(task)
}
