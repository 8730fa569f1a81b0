//! Fashion Frame Pipeline.
//!
//! main frame → human approval → three angle frames → review.
//!
//! Every step commits its own result before the next begins, so the pipeline
//! can be resumed from any step. Once a step has committed GENERATING, any
//! failure rolls the task back to DRAFT and records the error, so the step
//! can be invoked again. Frames committed earlier in the step are kept.

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::fashion::prompts::{
    angle_request, fallback_angle_prompt, fallback_main_prompt, main_frame_request,
    MainFrameBrief, ANGLES, PROMPT_MAX_TOKENS, PROMPT_WRITER_SYSTEM,
};
use crate::models::blogger::Blogger;
use crate::models::task::{ContentTask, FrameKey, LocationChoice, TaskOutfit};
use crate::providers::{
    AspectRatio, AssetMirror, ImageGenerator, ImageRequest, TextGenerator, TextOutcome,
    TextRequest,
};
use crate::store::{self, ContentStore};
use crate::tasks::{transition, TaskEvent};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainFrameOptions {
    /// Used verbatim instead of asking the text generator for a prompt.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

/// Location and outfit for a fashion task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FashionSetup {
    #[serde(default)]
    pub location: Option<LocationChoice>,
    #[serde(default)]
    pub outfit: Option<TaskOutfit>,
}

pub struct FramePipeline<'a> {
    store: &'a dyn ContentStore,
    text: &'a dyn TextGenerator,
    images: &'a dyn ImageGenerator,
    mirror: &'a dyn AssetMirror,
}

impl<'a> FramePipeline<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        text: &'a dyn TextGenerator,
        images: &'a dyn ImageGenerator,
        mirror: &'a dyn AssetMirror,
    ) -> Self {
        Self {
            store,
            text,
            images,
            mirror,
        }
    }

    /// Stores location and outfit. A saved-location index outside the
    /// blogger's list is NotFound.
    pub async fn configure(
        &self,
        task_id: Uuid,
        setup: FashionSetup,
    ) -> Result<ContentTask, AppError> {
        let task = store::require_task(self.store, task_id).await?;
        let blogger = store::require_blogger(self.store, task.blogger_id).await?;
        if let Some(choice) = &setup.location {
            resolve_location(&blogger, choice)?;
        }

        store::update_task(self.store, task_id, |task| {
            if let Some(location) = setup.location {
                task.location = Some(location);
            }
            if let Some(outfit) = setup.outfit {
                task.outfit = Some(outfit);
            }
            Ok(())
        })
        .await
    }

    /// Step 1: generate a 9:16 main frame and move the task to REVIEW.
    ///
    /// Uses edit mode when the outfit carries a reference image.
    pub async fn generate_main_frame(
        &self,
        task_id: Uuid,
        options: MainFrameOptions,
    ) -> Result<ContentTask, AppError> {
        let task = store::require_task(self.store, task_id).await?;
        self.images.check_configured()?;
        let blogger = store::require_blogger(self.store, task.blogger_id).await?;
        let location = task
            .location
            .as_ref()
            .map(|choice| resolve_location(&blogger, choice))
            .transpose()?;

        self.start(task_id).await?;
        match self
            .main_frame(&task, &blogger, location.as_deref(), options)
            .await
        {
            Ok(task) => {
                info!("Main frame ready for task {task_id}");
                Ok(task)
            }
            Err(e) => Err(self.fail(task_id, e).await),
        }
    }

    async fn main_frame(
        &self,
        task: &ContentTask,
        blogger: &Blogger,
        location: Option<&str>,
        options: MainFrameOptions,
    ) -> Result<ContentTask, AppError> {
        let custom = options
            .custom_instructions
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let brief = MainFrameBrief {
            blogger,
            location,
            outfit: task.outfit.as_ref(),
            custom_instructions: custom,
        };
        let prompt = match options.prompt.filter(|p| !p.trim().is_empty()) {
            Some(prompt) => prompt,
            None => {
                self.write_prompt(&main_frame_request(&brief), || fallback_main_prompt(&brief))
                    .await
            }
        };
        let reference = task.outfit.as_ref().and_then(TaskOutfit::reference_image);

        info!(
            "Generating main frame for task {} ({} mode)",
            task.id,
            if reference.is_some() { "edit" } else { "text-to-image" }
        );
        let generated = self
            .images
            .generate_image(ImageRequest {
                prompt: &prompt,
                aspect_ratio: AspectRatio::Portrait9x16,
                reference_image: reference,
            })
            .await?;
        let url = self.persist(task.id, FrameKey::Main, &generated).await;

        store::update_task(self.store, task.id, |task| {
            task.generated_images.append(FrameKey::Main, url);
            task.prompts.record(FrameKey::Main, prompt);
            transition(task, TaskEvent::GenerationSucceeded { review: true })
        })
        .await
    }

    /// Step 2: promote the latest generated image of `frame` to the main frame.
    ///
    /// Fails with PreconditionFailed, writing nothing, if that frame has no
    /// generated image yet.
    pub async fn approve_frame(
        &self,
        task_id: Uuid,
        frame: FrameKey,
    ) -> Result<ContentTask, AppError> {
        let task = store::update_task(self.store, task_id, |task| {
            let latest = task
                .generated_images
                .latest(frame)
                .map(String::from)
                .ok_or_else(|| {
                    AppError::PreconditionFailed(format!(
                        "No generated image for frame '{frame}' to approve"
                    ))
                })?;
            transition(task, TaskEvent::FrameApproved)?;
            task.main_image_url = Some(latest);
            Ok(())
        })
        .await?;

        info!("Approved {frame} frame for task {task_id}");
        Ok(task)
    }

    /// Step 3 and 4: three 4:5 angle frames referencing the approved main
    /// frame, each committed on its own, then REVIEW.
    ///
    /// Requires `main_image_url`; without it nothing is called or written.
    pub async fn generate_angle_frames(
        &self,
        task_id: Uuid,
        base_prompt: Option<String>,
    ) -> Result<ContentTask, AppError> {
        let task = store::require_task(self.store, task_id).await?;
        let main_image = task.main_image_url.clone().ok_or_else(|| {
            AppError::PreconditionFailed(
                "Approve a main frame before generating angle frames".to_string(),
            )
        })?;
        self.images.check_configured()?;

        self.start(task_id).await?;
        match self.angle_frames(&task, &main_image, base_prompt).await {
            Ok(task) => {
                info!("All angle frames ready for task {task_id}");
                Ok(task)
            }
            Err(e) => Err(self.fail(task_id, e).await),
        }
    }

    async fn angle_frames(
        &self,
        task: &ContentTask,
        main_image: &str,
        base_prompt: Option<String>,
    ) -> Result<ContentTask, AppError> {
        let base_prompt = base_prompt
            .filter(|p| !p.trim().is_empty())
            .or_else(|| task.prompts.get(FrameKey::Main).map(String::from))
            .unwrap_or_else(|| format!("Full-height fashion photo, {}", task.content_type));

        for (index, (frame, angle)) in ANGLES.iter().enumerate() {
            let prompt = self
                .write_prompt(&angle_request(index + 1, &base_prompt, angle), || {
                    fallback_angle_prompt(&base_prompt, angle)
                })
                .await;

            let generated = self
                .images
                .generate_image(ImageRequest {
                    prompt: &prompt,
                    aspect_ratio: AspectRatio::Portrait4x5,
                    reference_image: Some(main_image),
                })
                .await?;
            let url = self.persist(task.id, *frame, &generated).await;

            store::update_task(self.store, task.id, |task| {
                task.generated_images.append(*frame, url);
                task.prompts.record(*frame, prompt);
                Ok(())
            })
            .await?;
            info!("Generated {frame} for task {}", task.id);
        }

        store::update_task(self.store, task.id, |task| {
            transition(task, TaskEvent::GenerationSucceeded { review: true })
        })
        .await
    }

    /// Commits GENERATING and clears the previous error.
    async fn start(&self, task_id: Uuid) -> Result<(), AppError> {
        store::update_task(self.store, task_id, |task| {
            transition(task, TaskEvent::GenerationDispatched)?;
            task.prompts.clear_error();
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Rolls back to DRAFT, keeps the error text, and hands the error back.
    async fn fail(&self, task_id: Uuid, e: AppError) -> AppError {
        error!("Fashion pipeline failed for task {task_id}: {e}");
        let reason = e.to_string();
        let rollback = store::update_task(self.store, task_id, |task| {
            transition(task, TaskEvent::GenerationFailed)?;
            task.prompts.record_error(reason);
            Ok(())
        })
        .await;
        if let Err(rollback_err) = rollback {
            error!("Could not roll back task {task_id}: {rollback_err}");
        }
        e
    }

    async fn persist(&self, task_id: Uuid, frame: FrameKey, url: &str) -> String {
        let key = format!("fashion/{task_id}/{frame}-{}.jpg", Uuid::new_v4());
        self.mirror.mirror(url, &key).await
    }

    async fn write_prompt(&self, request: &str, fallback: impl FnOnce() -> String) -> String {
        let outcome = self
            .text
            .generate_text(TextRequest {
                prompt: request,
                max_tokens: PROMPT_MAX_TOKENS,
                system: PROMPT_WRITER_SYSTEM,
            })
            .await;
        match outcome {
            TextOutcome::Generated(prompt) => prompt,
            TextOutcome::Fallback { reason, .. } => {
                warn!("Building frame prompt locally: {reason}");
                fallback()
            }
        }
    }
}

/// Human-readable location for prompts.
pub fn resolve_location(blogger: &Blogger, choice: &LocationChoice) -> Result<String, AppError> {
    match choice {
        LocationChoice::Saved { index } => {
            let location = blogger.locations.get(*index).ok_or_else(|| {
                AppError::NotFound(format!(
                    "Location {index} not found for blogger {}",
                    blogger.id
                ))
            })?;
            Ok(match location.description.as_deref() {
                Some(description) if !description.trim().is_empty() => {
                    format!("{}: {}", location.title, description.trim())
                }
                _ => location.title.clone(),
            })
        }
        LocationChoice::Custom { description } => Ok(description.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::blogger::GarmentSlot;
    use crate::models::task::{OutfitSlot, SlotKind};
    use crate::providers::fakes::{MemoryStorage, RecordingImages, ScriptedText};
    use crate::store::memory::MemoryStore;
    use crate::tasks::TaskStatus;
    use crate::test_support::{seed_blogger, seed_task};

    struct Fixture {
        store: MemoryStore,
        text: ScriptedText,
        images: RecordingImages,
        mirror: MemoryStorage,
    }

    impl Fixture {
        fn new(images: RecordingImages) -> Self {
            Self {
                store: MemoryStore::new(),
                text: ScriptedText::unavailable(),
                images,
                mirror: MemoryStorage::default(),
            }
        }

        fn pipeline(&self) -> FramePipeline<'_> {
            FramePipeline::new(&self.store, &self.text, &self.images, &self.mirror)
        }

        async fn task(&self, status: TaskStatus) -> ContentTask {
            let blogger = seed_blogger(&self.store).await;
            seed_task(&self.store, blogger.id, status).await
        }

        async fn reload(&self, id: Uuid) -> ContentTask {
            self.store.task(id).await.unwrap().unwrap()
        }
    }

    fn url_slot(value: &str) -> OutfitSlot {
        OutfitSlot {
            kind: SlotKind::Url,
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_main_frame_text_to_image_goes_to_review() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::ScriptReady).await;

        let done = fx
            .pipeline()
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();

        assert_eq!(done.status, TaskStatus::Review);
        assert_eq!(done.generated_images.history(FrameKey::Main).len(), 1);
        assert!(done.prompts.get(FrameKey::Main).unwrap().contains("Mila"));
        let calls = fx.images.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].aspect_ratio, AspectRatio::Portrait9x16);
        assert_eq!(calls[0].reference_image, None);
    }

    #[tokio::test]
    async fn test_main_frame_uses_first_outfit_url_in_edit_mode() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::Draft).await;
        let mut outfit = TaskOutfit::default();
        outfit.set(GarmentSlot::Accessories, url_slot("https://cdn.test/bag.jpg"));
        outfit.set(GarmentSlot::Bottom, url_slot("https://cdn.test/jeans.jpg"));
        fx.pipeline()
            .configure(
                task.id,
                FashionSetup {
                    location: Some(LocationChoice::Saved { index: 0 }),
                    outfit: Some(outfit),
                },
            )
            .await
            .unwrap();

        fx.pipeline()
            .generate_main_frame(
                task.id,
                MainFrameOptions {
                    prompt: None,
                    custom_instructions: Some("holding a coffee cup".into()),
                },
            )
            .await
            .unwrap();

        let call = &fx.images.calls()[0];
        assert_eq!(call.reference_image.as_deref(), Some("https://cdn.test/jeans.jpg"));
        assert!(call.prompt.contains("Old town: cobbled street with warm evening light"));
        assert!(call.prompt.contains("holding a coffee cup"));
    }

    #[tokio::test]
    async fn test_main_frame_provider_failure_rolls_back() {
        let fx = Fixture::new(RecordingImages::failing());
        let task = fx.task(TaskStatus::ScriptReady).await;

        let err = fx
            .pipeline()
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        let stored = fx.reload(task.id).await;
        assert_eq!(stored.status, TaskStatus::Draft);
        assert!(stored.generated_images.history(FrameKey::Main).is_empty());
        assert!(stored.prompts.error().unwrap().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_unconfigured_images_fail_without_state_change() {
        let fx = Fixture::new(RecordingImages::unconfigured());
        let task = fx.task(TaskStatus::ScriptReady).await;

        let err = fx
            .pipeline()
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(fx.store.task_saves(), 0);
        assert_eq!(fx.reload(task.id).await.status, TaskStatus::ScriptReady);
    }

    #[tokio::test]
    async fn test_bad_location_index_is_not_found() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::Draft).await;

        let err = fx
            .pipeline()
            .configure(
                task.id,
                FashionSetup {
                    location: Some(LocationChoice::Saved { index: 9 }),
                    outfit: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.reload(task.id).await.location, None);
    }

    #[tokio::test]
    async fn test_approve_without_generated_frame_is_precondition_failure() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::Review).await;

        let err = fx
            .pipeline()
            .approve_frame(task.id, FrameKey::Main)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PreconditionFailed(_)));
        let stored = fx.reload(task.id).await;
        assert_eq!(stored.status, TaskStatus::Review);
        assert_eq!(stored.main_image_url, None);
        assert_eq!(fx.store.task_saves(), 0);
    }

    #[tokio::test]
    async fn test_approve_copies_latest_main_frame() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::ScriptReady).await;
        let pipeline = fx.pipeline();
        pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();
        // regenerate once more; approval takes the newest
        pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();

        let approved = pipeline.approve_frame(task.id, FrameKey::Main).await.unwrap();

        assert_eq!(approved.status, TaskStatus::MainFrameApproved);
        assert_eq!(
            approved.main_image_url.as_deref(),
            approved.generated_images.latest(FrameKey::Main)
        );
        assert_eq!(approved.generated_images.history(FrameKey::Main).len(), 2);
    }

    #[tokio::test]
    async fn test_angles_before_approval_make_no_calls() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::Review).await;

        let err = fx
            .pipeline()
            .generate_angle_frames(task.id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PreconditionFailed(_)));
        assert!(fx.images.calls().is_empty());
        assert!(fx.text.prompts().is_empty());
        assert_eq!(fx.reload(task.id).await.status, TaskStatus::Review);
    }

    #[tokio::test]
    async fn test_full_pipeline_produces_three_referenced_angles() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::ScriptReady).await;
        let pipeline = fx.pipeline();
        pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();
        let approved = pipeline.approve_frame(task.id, FrameKey::Main).await.unwrap();
        let main = approved.main_image_url.unwrap();

        let done = pipeline.generate_angle_frames(task.id, None).await.unwrap();

        assert_eq!(done.status, TaskStatus::Review);
        for (frame, _) in ANGLES {
            assert_eq!(done.generated_images.history(frame).len(), 1, "{frame}");
            assert!(done.prompts.get(frame).is_some());
        }
        let angle_calls = &fx.images.calls()[1..];
        assert_eq!(angle_calls.len(), 3);
        for call in angle_calls {
            assert_eq!(call.aspect_ratio, AspectRatio::Portrait4x5);
            assert_eq!(call.reference_image.as_deref(), Some(main.as_str()));
        }
        assert!(angle_calls[0].prompt.contains("close-up"));
    }

    #[tokio::test]
    async fn test_angle_failure_keeps_earlier_angles() {
        // call 0 is the main frame, 1 is angle1, 2 fails
        let fx = Fixture::new(RecordingImages::failing_from(2));
        let task = fx.task(TaskStatus::ScriptReady).await;
        let pipeline = fx.pipeline();
        pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();
        pipeline.approve_frame(task.id, FrameKey::Main).await.unwrap();

        let err = pipeline.generate_angle_frames(task.id, None).await.unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        let stored = fx.reload(task.id).await;
        assert_eq!(stored.status, TaskStatus::Draft);
        assert_eq!(stored.generated_images.history(FrameKey::Angle1).len(), 1);
        assert!(stored.generated_images.history(FrameKey::Angle2).is_empty());
        assert!(stored.main_image_url.is_some());
        assert!(stored.prompts.error().is_some());
    }

    #[tokio::test]
    async fn test_generated_prompt_is_used_when_text_is_available() {
        let mut fx = Fixture::new(RecordingImages::new());
        fx.text = ScriptedText::always("Editorial full-height shot, golden hour");
        let task = fx.task(TaskStatus::ScriptReady).await;

        fx.pipeline()
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();

        assert_eq!(
            fx.images.calls()[0].prompt,
            "Editorial full-height shot, golden hour"
        );
    }

    #[tokio::test]
    async fn test_failed_commit_after_main_frame_rolls_back_and_can_be_retried() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::ScriptReady).await;
        fx.store.fail_next_save(|t| t.status == TaskStatus::Review);
        let pipeline = fx.pipeline();

        let err = pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let stored = fx.reload(task.id).await;
        assert_eq!(stored.status, TaskStatus::Draft);
        assert!(stored.prompts.error().unwrap().contains("Database error"));
        assert!(stored.generated_images.history(FrameKey::Main).is_empty());

        let retried = pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();
        assert_eq!(retried.status, TaskStatus::Review);
        assert_eq!(retried.prompts.error(), None);
    }

    #[tokio::test]
    async fn test_failed_angle_commit_rolls_back_and_keeps_earlier_angles() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::ScriptReady).await;
        let pipeline = fx.pipeline();
        pipeline
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap();
        pipeline.approve_frame(task.id, FrameKey::Main).await.unwrap();
        fx.store
            .fail_next_save(|t| !t.generated_images.history(FrameKey::Angle2).is_empty());

        let err = pipeline.generate_angle_frames(task.id, None).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let stored = fx.reload(task.id).await;
        assert_eq!(stored.status, TaskStatus::Draft);
        assert!(stored.prompts.error().is_some());
        assert_eq!(stored.generated_images.history(FrameKey::Angle1).len(), 1);
        assert!(stored.generated_images.history(FrameKey::Angle2).is_empty());
    }

    #[tokio::test]
    async fn test_main_frame_while_generating_is_rejected_without_calls() {
        let fx = Fixture::new(RecordingImages::new());
        let task = fx.task(TaskStatus::Generating).await;

        let err = fx
            .pipeline()
            .generate_main_frame(task.id, MainFrameOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert!(fx.images.calls().is_empty());
        assert!(fx.text.prompts().is_empty());
        assert_eq!(fx.reload(task.id).await.status, TaskStatus::Generating);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found_even_without_credentials() {
        let fx = Fixture::new(RecordingImages::unconfigured());

        let err = fx
            .pipeline()
            .generate_main_frame(Uuid::new_v4(), MainFrameOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
