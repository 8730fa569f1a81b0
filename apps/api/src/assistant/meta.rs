//! Styling, location and weather suggestions for a task, kept as an
//! append-only TaskMeta log.

use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::Blogger;
use crate::models::history::{MetaSuggestion, TaskMeta};
use crate::models::task::ContentTask;
use crate::planning::plan::Season;
use crate::providers::openai::strip_json_fences;
use crate::providers::{TextGenerator, TextOutcome, TextRequest};
use crate::store::{self, ContentStore};

const META_MAX_TOKENS: u32 = 400;
const META_SYSTEM_PROMPT: &str = "You are a styling assistant for social media shoots. \
Respond with a JSON object with the string fields \"outfit\", \"location\", \"weather\" and \"notes\".";

/// Generates a suggestion and appends it to the task's meta log.
///
/// Unparseable model output is kept whole under `notes`; an unavailable
/// provider yields a suggestion carrying only the placeholder note.
pub async fn generate_meta(
    store: &dyn ContentStore,
    text: &dyn TextGenerator,
    task_id: Uuid,
) -> Result<TaskMeta, AppError> {
    let task = store::require_task(store, task_id).await?;
    let blogger = store::require_blogger(store, task.blogger_id).await?;
    let prompt = meta_prompt(&blogger, &task);

    let outcome = text
        .generate_text(TextRequest {
            prompt: &prompt,
            max_tokens: META_MAX_TOKENS,
            system: META_SYSTEM_PROMPT,
        })
        .await;

    let suggestion = match outcome {
        TextOutcome::Generated(raw) => parse_suggestion(&raw),
        TextOutcome::Fallback { text, reason } => {
            warn!("Meta suggestion for task {task_id} unavailable: {reason}");
            MetaSuggestion {
                notes: Some(text),
                ..MetaSuggestion::default()
            }
        }
    };

    store.append_meta(task_id, &suggestion).await
}

pub async fn latest_meta(store: &dyn ContentStore, task_id: Uuid) -> Result<TaskMeta, AppError> {
    store::require_task(store, task_id).await?;
    store
        .latest_meta(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No suggestions for task {task_id} yet")))
}

fn parse_suggestion(raw: &str) -> MetaSuggestion {
    match serde_json::from_str::<MetaSuggestion>(strip_json_fences(raw)) {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!("Meta suggestion was not valid JSON, keeping it as notes: {e}");
            MetaSuggestion {
                notes: Some(raw.trim().to_string()),
                ..MetaSuggestion::default()
            }
        }
    }
}

fn meta_prompt(blogger: &Blogger, task: &ContentTask) -> String {
    format!(
        "Suggest an outfit, a shooting location and the weather to plan for.\n\
         Blogger: {} ({} blogger, theme: {})\n\
         Date: {} ({})\n\
         Content: {}\n\
         Idea: {}",
        blogger.name,
        blogger.kind.as_str(),
        blogger.theme.as_deref().unwrap_or("lifestyle"),
        task.date.format("%B %-d, %Y"),
        Season::of(task.date).as_str(),
        task.content_type,
        task.idea.as_deref().unwrap_or("open"),
    )
}
