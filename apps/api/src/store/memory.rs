//! In-memory `ContentStore` for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::Blogger;
use crate::models::history::{MetaSuggestion, TaskMeta, TaskVersion};
use crate::models::task::{ContentTask, NewTask};
use crate::store::{ContentStore, VersionDraft};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    bloggers: HashMap<Uuid, Blogger>,
    tasks: HashMap<Uuid, ContentTask>,
    versions: Vec<TaskVersion>,
    meta: Vec<TaskMeta>,
    task_saves: usize,
    save_fault: Option<SaveFault>,
}

/// One-shot `save_task` failure for tasks matching a predicate.
struct SaveFault(Box<dyn Fn(&ContentTask) -> bool + Send + Sync>);

impl std::fmt::Debug for SaveFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SaveFault")
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_task` commits so far.
    pub fn task_saves(&self) -> usize {
        self.read().task_saves
    }

    /// The next `save_task` whose task matches `when` fails as if the
    /// database had gone away. Later saves succeed again.
    pub fn fail_next_save(&self, when: impl Fn(&ContentTask) -> bool + Send + Sync + 'static) {
        self.write().save_fault = Some(SaveFault(Box::new(when)));
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().expect("memory store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_bloggers(&self) -> Result<Vec<Blogger>, AppError> {
        let mut bloggers: Vec<Blogger> = self.read().bloggers.values().cloned().collect();
        bloggers.sort_by_key(|b| b.created_at);
        Ok(bloggers)
    }

    async fn blogger(&self, id: Uuid) -> Result<Option<Blogger>, AppError> {
        Ok(self.read().bloggers.get(&id).cloned())
    }

    async fn insert_blogger(&self, blogger: &Blogger) -> Result<(), AppError> {
        self.write().bloggers.insert(blogger.id, blogger.clone());
        Ok(())
    }

    async fn save_blogger(&self, blogger: &Blogger) -> Result<(), AppError> {
        let mut state = self.write();
        match state.bloggers.get_mut(&blogger.id) {
            Some(existing) => {
                *existing = blogger.clone();
                existing.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Blogger {} not found", blogger.id))),
        }
    }

    async fn delete_blogger(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.write();
        state.tasks.retain(|_, t| t.blogger_id != id);
        Ok(state.bloggers.remove(&id).is_some())
    }

    async fn list_tasks(&self, blogger_id: Option<Uuid>) -> Result<Vec<ContentTask>, AppError> {
        let mut tasks: Vec<ContentTask> = self
            .read()
            .tasks
            .values()
            .filter(|t| blogger_id.map_or(true, |id| t.blogger_id == id))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.date, t.created_at));
        Ok(tasks)
    }

    async fn task(&self, id: Uuid) -> Result<Option<ContentTask>, AppError> {
        Ok(self.read().tasks.get(&id).cloned())
    }

    async fn create_task(&self, new: &NewTask) -> Result<ContentTask, AppError> {
        let mut state = self.write();
        if !state.bloggers.contains_key(&new.blogger_id) {
            // mirrors the foreign key violation Postgres would raise
            return Err(AppError::NotFound(format!("Blogger {} not found", new.blogger_id)));
        }
        let task = ContentTask::from_new(new);
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn save_task(&self, task: &ContentTask) -> Result<(), AppError> {
        let mut state = self.write();
        if state.save_fault.as_ref().is_some_and(|fault| (fault.0)(task)) {
            state.save_fault = None;
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        state.task_saves += 1;
        match state.tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task.clone();
                existing.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Task {} not found", task.id))),
        }
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.write();
        state.versions.retain(|v| v.task_id != id);
        state.meta.retain(|m| m.task_id != id);
        Ok(state.tasks.remove(&id).is_some())
    }

    async fn append_version(
        &self,
        task_id: Uuid,
        draft: &VersionDraft,
    ) -> Result<TaskVersion, AppError> {
        let mut state = self.write();
        let version = state.versions.iter().filter(|v| v.task_id == task_id).count() as i32 + 1;
        let entry = TaskVersion {
            id: Uuid::new_v4(),
            task_id,
            version,
            idea: draft.idea.clone(),
            script: draft.script.clone(),
            source: draft.source.as_str().to_string(),
            created_at: Utc::now(),
        };
        state.versions.push(entry.clone());
        Ok(entry)
    }

    async fn versions(&self, task_id: Uuid) -> Result<Vec<TaskVersion>, AppError> {
        Ok(self
            .read()
            .versions
            .iter()
            .filter(|v| v.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn append_meta(
        &self,
        task_id: Uuid,
        data: &MetaSuggestion,
    ) -> Result<TaskMeta, AppError> {
        let entry = TaskMeta {
            id: Uuid::new_v4(),
            task_id,
            data: Json(data.clone()),
            created_at: Utc::now(),
        };
        self.write().meta.push(entry.clone());
        Ok(entry)
    }

    async fn latest_meta(&self, task_id: Uuid) -> Result<Option<TaskMeta>, AppError> {
        Ok(self
            .read()
            .meta
            .iter()
            .rev()
            .find(|m| m.task_id == task_id)
            .cloned())
    }
}
