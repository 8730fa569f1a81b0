//! Idea and script writes, by hand or through the script generator.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::blogger::Blogger;
use crate::models::history::VersionSource;
use crate::models::task::ContentTask;
use crate::providers::{TextGenerator, TextOutcome, TextRequest};
use crate::store::{self, ContentStore, VersionDraft};
use crate::tasks::{transition, TaskEvent};

const SCRIPT_MAX_TOKENS: u32 = 600;
const SCRIPT_SYSTEM_PROMPT: &str = "You write short, spoken social media scripts. \
Reply with the script only: no headings, no stage directions, no hashtags.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub idea: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
}

impl ContentUpdate {
    fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.idea) && blank(&self.script)
    }
}

#[derive(Debug, Serialize)]
pub struct ScriptResult {
    pub task: ContentTask,
    /// Set when the text provider was unavailable and a placeholder was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Saves idea and/or script, records a version and applies `ContentWritten`.
///
/// From DRAFT or PLANNED the task becomes SCRIPT_READY; any other status is
/// kept as is.
pub async fn write_content(
    store: &dyn ContentStore,
    task_id: Uuid,
    update: ContentUpdate,
    source: VersionSource,
) -> Result<ContentTask, AppError> {
    if update.is_empty() {
        return Err(AppError::Validation(
            "Provide an idea or a script to save".to_string(),
        ));
    }

    let task = store::update_task(store, task_id, |task| {
        if let Some(idea) = update.idea {
            task.idea = Some(idea);
        }
        if let Some(script) = update.script {
            task.script = Some(script);
        }
        transition(task, TaskEvent::ContentWritten)
    })
    .await?;

    let version = store
        .append_version(
            task_id,
            &VersionDraft {
                idea: task.idea.clone(),
                script: task.script.clone(),
                source,
            },
        )
        .await?;

    info!(
        "Saved content for task {task_id} (version {}, status {})",
        version.version, task.status
    );
    Ok(task)
}

/// Asks the script generator for a script and saves it like a manual write.
/// Provider trouble never fails the call: the placeholder is stored instead.
pub async fn generate_script(
    store: &dyn ContentStore,
    text: &dyn TextGenerator,
    task_id: Uuid,
) -> Result<ScriptResult, AppError> {
    let task = store::require_task(store, task_id).await?;
    let blogger = store::require_blogger(store, task.blogger_id).await?;
    let prompt = script_prompt(&blogger, &task);

    let outcome = text
        .generate_text(TextRequest {
            prompt: &prompt,
            max_tokens: SCRIPT_MAX_TOKENS,
            system: SCRIPT_SYSTEM_PROMPT,
        })
        .await;

    let (script, fallback_reason) = match outcome {
        TextOutcome::Generated(script) => (script, None),
        TextOutcome::Fallback { text, reason } => {
            warn!("Storing placeholder script for task {task_id}: {reason}");
            (text, Some(reason))
        }
    };

    let update = ContentUpdate {
        idea: None,
        script: Some(script),
    };
    let task = write_content(store, task_id, update, VersionSource::Ai).await?;
    Ok(ScriptResult {
        task,
        fallback_reason,
    })
}

fn script_prompt(blogger: &Blogger, task: &ContentTask) -> String {
    let mut prompt = format!(
        "Write a script for a {} by {}, a {} blogger.",
        task.content_type,
        blogger.name,
        blogger.kind.as_str()
    );
    if let Some(theme) = blogger.theme.as_deref() {
        prompt.push_str(&format!(" Theme: {theme}."));
    }
    if let Some(tone) = blogger.tone_of_voice.as_deref() {
        prompt.push_str(&format!(" Tone of voice: {tone}."));
    }
    prompt.push_str(&format!(
        "\nIdea: {}",
        task.idea.as_deref().unwrap_or(&task.content_type)
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fakes::ScriptedText;
    use crate::store::memory::MemoryStore;
    use crate::tasks::TaskStatus;
    use crate::test_support::{seed_blogger, seed_task};

    fn script(text: &str) -> ContentUpdate {
        ContentUpdate {
            idea: None,
            script: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_script_write_in_draft_moves_to_script_ready() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Draft).await;

        let saved = write_content(&store, task.id, script("Hook. Body. CTA."), VersionSource::User)
            .await
            .unwrap();

        assert_eq!(saved.status, TaskStatus::ScriptReady);
        assert_eq!(saved.script.as_deref(), Some("Hook. Body. CTA."));
        let stored = store.task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::ScriptReady);
    }

    #[tokio::test]
    async fn test_script_write_in_review_keeps_status() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Review).await;

        let saved = write_content(&store, task.id, script("Edited"), VersionSource::User)
            .await
            .unwrap();

        assert_eq!(saved.status, TaskStatus::Review);
        assert_eq!(saved.script.as_deref(), Some("Edited"));
    }

    #[tokio::test]
    async fn test_each_write_appends_a_version() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Planned).await;

        write_content(&store, task.id, script("v1"), VersionSource::User)
            .await
            .unwrap();
        write_content(&store, task.id, script("v2"), VersionSource::User)
            .await
            .unwrap();

        let versions = store.versions(task.id).await.unwrap();
        let numbers: Vec<i32> = versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(versions[1].script.as_deref(), Some("v2"));
        assert_eq!(versions[1].idea.as_deref(), Some("Layering a wool coat three ways"));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected_without_writes() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Draft).await;

        let err = write_content(
            &store,
            task.id,
            ContentUpdate {
                idea: Some("   ".into()),
                script: None,
            },
            VersionSource::User,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.task_saves(), 0);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let store = MemoryStore::new();
        let err = write_content(&store, Uuid::new_v4(), script("x"), VersionSource::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_generated_script_is_saved_as_ai_version() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Planned).await;
        let text = ScriptedText::always("Three ways to wear one coat.");

        let result = generate_script(&store, &text, task.id).await.unwrap();

        assert_eq!(result.fallback_reason, None);
        assert_eq!(result.task.status, TaskStatus::ScriptReady);
        assert_eq!(result.task.script.as_deref(), Some("Three ways to wear one coat."));
        let prompt = &text.prompts()[0];
        assert!(prompt.contains("Mila"));
        assert!(prompt.contains("Layering a wool coat three ways"));
        assert_eq!(store.versions(task.id).await.unwrap()[0].source, "ai");
    }

    #[tokio::test]
    async fn test_unavailable_text_provider_stores_placeholder() {
        let store = MemoryStore::new();
        let blogger = seed_blogger(&store).await;
        let task = seed_task(&store, blogger.id, TaskStatus::Draft).await;

        let result = generate_script(&store, &ScriptedText::unavailable(), task.id)
            .await
            .unwrap();

        assert!(result.fallback_reason.is_some());
        assert!(result.task.script.unwrap().starts_with("[AI Draft] "));
    }
}
