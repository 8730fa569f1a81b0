use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::{Blogger, BloggerRow};
use crate::models::history::{MetaSuggestion, TaskMeta, TaskVersion};
use crate::models::task::{ContentTask, ContentTaskRow, NewTask};
use crate::store::{ContentStore, VersionDraft};

/// sqlx-backed store. Every method is its own statement or transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_blogger(row: BloggerRow) -> Result<Blogger, AppError> {
    Blogger::try_from(row).map_err(AppError::Internal)
}

fn to_task(row: ContentTaskRow) -> Result<ContentTask, AppError> {
    ContentTask::try_from(row).map_err(AppError::Internal)
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_bloggers(&self) -> Result<Vec<Blogger>, AppError> {
        sqlx::query_as::<_, BloggerRow>("SELECT * FROM bloggers ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(to_blogger)
            .collect()
    }

    async fn blogger(&self, id: Uuid) -> Result<Option<Blogger>, AppError> {
        sqlx::query_as::<_, BloggerRow>("SELECT * FROM bloggers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(to_blogger)
            .transpose()
    }

    async fn insert_blogger(&self, blogger: &Blogger) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bloggers
                (id, name, kind, image, tone_of_voice, theme, voice_id,
                 content_frequency, locations, outfits, editing_types_enabled,
                 subtitles_enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(blogger.id)
        .bind(&blogger.name)
        .bind(blogger.kind.as_str())
        .bind(&blogger.image)
        .bind(&blogger.tone_of_voice)
        .bind(&blogger.theme)
        .bind(&blogger.voice_id)
        .bind(Json(blogger.content_frequency.entries()))
        .bind(Json(&blogger.locations))
        .bind(Json(&blogger.outfits))
        .bind(Json(&blogger.editing_types_enabled))
        .bind(blogger.subtitles_enabled)
        .bind(blogger.created_at)
        .bind(blogger.updated_at)
        .execute(&self.pool)
        .await?;

        info!("Created blogger {} ({})", blogger.id, blogger.name);
        Ok(())
    }

    async fn save_blogger(&self, blogger: &Blogger) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE bloggers SET
                name = $2, kind = $3, image = $4, tone_of_voice = $5, theme = $6,
                voice_id = $7, content_frequency = $8, locations = $9, outfits = $10,
                editing_types_enabled = $11, subtitles_enabled = $12, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(blogger.id)
        .bind(&blogger.name)
        .bind(blogger.kind.as_str())
        .bind(&blogger.image)
        .bind(&blogger.tone_of_voice)
        .bind(&blogger.theme)
        .bind(&blogger.voice_id)
        .bind(Json(blogger.content_frequency.entries()))
        .bind(Json(&blogger.locations))
        .bind(Json(&blogger.outfits))
        .bind(Json(&blogger.editing_types_enabled))
        .bind(blogger.subtitles_enabled)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Blogger {} not found", blogger.id)));
        }
        Ok(())
    }

    async fn delete_blogger(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // The FK cascades as well; deleting explicitly keeps the count for the log.
        let tasks = sqlx::query("DELETE FROM content_tasks WHERE blogger_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM bloggers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if deleted > 0 {
            info!("Deleted blogger {id} and {tasks} tasks");
        }
        Ok(deleted > 0)
    }

    async fn list_tasks(&self, blogger_id: Option<Uuid>) -> Result<Vec<ContentTask>, AppError> {
        sqlx::query_as::<_, ContentTaskRow>(
            r#"
            SELECT * FROM content_tasks
            WHERE ($1::uuid IS NULL OR blogger_id = $1)
            ORDER BY date ASC, created_at ASC
            "#,
        )
        .bind(blogger_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(to_task)
        .collect()
    }

    async fn task(&self, id: Uuid) -> Result<Option<ContentTask>, AppError> {
        sqlx::query_as::<_, ContentTaskRow>("SELECT * FROM content_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(to_task)
            .transpose()
    }

    async fn create_task(&self, new: &NewTask) -> Result<ContentTask, AppError> {
        let task = ContentTask::from_new(new);
        let row = sqlx::query_as::<_, ContentTaskRow>(
            r#"
            INSERT INTO content_tasks
                (id, blogger_id, date, content_type, idea, status, editing_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(task.blogger_id)
        .bind(task.date)
        .bind(&task.content_type)
        .bind(&task.idea)
        .bind(task.status.as_str())
        .bind(task.editing_type.map(|e| e.as_str()))
        .fetch_one(&self.pool)
        .await?;

        to_task(row)
    }

    async fn save_task(&self, task: &ContentTask) -> Result<(), AppError> {
        let (location_id, location_description) = task.location_columns();
        let result = sqlx::query(
            r#"
            UPDATE content_tasks SET
                date = $2, content_type = $3, idea = $4, status = $5, script = $6,
                preview_url = $7, editing_type = $8, location_id = $9,
                location_description = $10, outfit = $11, main_image_url = $12,
                prompts = $13, generated_images = $14, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(task.date)
        .bind(&task.content_type)
        .bind(&task.idea)
        .bind(task.status.as_str())
        .bind(&task.script)
        .bind(&task.preview_url)
        .bind(task.editing_type.map(|e| e.as_str()))
        .bind(location_id)
        .bind(location_description)
        .bind(task.outfit.as_ref().map(Json))
        .bind(&task.main_image_url)
        .bind(Json(&task.prompts))
        .bind(Json(&task.generated_images))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", task.id)));
        }
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM content_tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_version(
        &self,
        task_id: Uuid,
        draft: &VersionDraft,
    ) -> Result<TaskVersion, AppError> {
        // Append-only: the next version number is derived in the same statement.
        Ok(sqlx::query_as::<_, TaskVersion>(
            r#"
            INSERT INTO task_versions (id, task_id, version, idea, script, source)
            SELECT $1, $2, COALESCE(MAX(version), 0) + 1, $3, $4, $5
            FROM task_versions
            WHERE task_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(&draft.idea)
        .bind(&draft.script)
        .bind(draft.source.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn versions(&self, task_id: Uuid) -> Result<Vec<TaskVersion>, AppError> {
        Ok(sqlx::query_as::<_, TaskVersion>(
            "SELECT * FROM task_versions WHERE task_id = $1 ORDER BY version ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn append_meta(
        &self,
        task_id: Uuid,
        data: &MetaSuggestion,
    ) -> Result<TaskMeta, AppError> {
        Ok(sqlx::query_as::<_, TaskMeta>(
            "INSERT INTO task_meta (id, task_id, data) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?)
    }

    async fn latest_meta(&self, task_id: Uuid) -> Result<Option<TaskMeta>, AppError> {
        Ok(sqlx::query_as::<_, TaskMeta>(
            "SELECT * FROM task_meta WHERE task_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
