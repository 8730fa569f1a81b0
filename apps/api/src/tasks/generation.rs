//! Asset generation for a single task: dispatch from the API, execution in a worker.
//!
//! Dispatch moves the task to GENERATING and enqueues a job. The worker
//! generates the asset, mirrors it into durable storage and moves the task to
//! REVIEW (or VISUAL_READY when review is skipped). A provider failure rolls
//! the task back to DRAFT with the error kept under the reserved `error` key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::queue::JobQueue;
use crate::jobs::Job;
use crate::models::task::{ContentTask, FrameKey};
use crate::providers::{
    AspectRatio, AssetMirror, ImageGenerator, ImageRequest, ProviderError, VideoGenerator,
    VoiceGenerator, VoiceRequest,
};
use crate::store::{self, ContentStore};
use crate::tasks::{transition, TaskEvent, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Video,
    Voice,
}

impl AssetKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Voice => "voice",
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            AssetKind::Image => "jpg",
            AssetKind::Video => "mp4",
            AssetKind::Voice => "mp3",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub asset: AssetKind,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub skip_review: bool,
}

#[derive(Debug, Serialize)]
pub struct DispatchReceipt {
    pub queued: bool,
    pub task_id: Uuid,
    pub job_id: Uuid,
    pub status: TaskStatus,
}

/// Generators a worker needs to produce an asset.
#[derive(Clone)]
pub struct AssetServices {
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    pub voices: Arc<dyn VoiceGenerator>,
    pub mirror: Arc<dyn AssetMirror>,
}

impl AssetServices {
    pub fn check_configured(&self, asset: AssetKind) -> Result<(), ProviderError> {
        match asset {
            AssetKind::Image => self.images.check_configured(),
            AssetKind::Video => self.videos.check_configured(),
            AssetKind::Voice => self.voices.check_configured(),
        }
    }
}

/// Starts generation: GENERATING is committed before the job is enqueued, so
/// a worker never sees the task in an earlier status.
pub async fn dispatch_asset_generation(
    store: &dyn ContentStore,
    jobs: &dyn JobQueue,
    services: &AssetServices,
    task_id: Uuid,
    request: GenerateRequest,
) -> Result<DispatchReceipt, AppError> {
    services.check_configured(request.asset)?;

    store::update_task(store, task_id, |task| {
        transition(task, TaskEvent::GenerationDispatched)?;
        task.prompts.clear_error();
        Ok(())
    })
    .await?;

    let job = Job::GenerateAsset {
        task_id,
        asset: request.asset,
        prompt: request.prompt,
        skip_review: request.skip_review,
    };
    let job_id = match jobs.enqueue(job).await {
        Ok(id) => id,
        Err(e) => {
            error!("Could not enqueue {} job for task {task_id}: {e}", request.asset.as_str());
            let reason = e.to_string();
            let rollback = store::update_task(store, task_id, |task| {
                transition(task, TaskEvent::GenerationFailed)?;
                task.prompts.record_error(reason);
                Ok(())
            })
            .await;
            if let Err(rollback_err) = rollback {
                error!("Could not roll back task {task_id}: {rollback_err}");
            }
            return Err(e);
        }
    };

    info!(
        "Queued {} generation for task {task_id} as job {job_id}",
        request.asset.as_str()
    );
    Ok(DispatchReceipt {
        queued: true,
        task_id,
        job_id,
        status: TaskStatus::Generating,
    })
}

/// Worker side of a `generate_asset` job.
///
/// A task that is no longer GENERATING (reset by an operator, or already
/// finished by a duplicate delivery) is skipped. Any failure after that check
/// rolls the task back to DRAFT with the error recorded.
pub async fn run_asset_job(
    store: &dyn ContentStore,
    services: &AssetServices,
    task_id: Uuid,
    asset: AssetKind,
    prompt: Option<String>,
    skip_review: bool,
) -> Result<(), AppError> {
    let task = store::require_task(store, task_id).await?;
    if task.status != TaskStatus::Generating {
        warn!(
            "Skipping {} job for task {task_id}: status is {}",
            asset.as_str(),
            task.status
        );
        return Ok(());
    }

    match produce_asset(store, services, &task, asset, prompt, skip_review).await {
        Ok(task) => {
            info!(
                "Generated {} for task {task_id}, status now {}",
                asset.as_str(),
                task.status
            );
            Ok(())
        }
        Err(e) => {
            error!("{} generation failed for task {task_id}: {e}", asset.as_str());
            let reason = e.to_string();
            let rollback = store::update_task(store, task_id, |task| {
                transition(task, TaskEvent::GenerationFailed)?;
                task.prompts.record_error(reason);
                Ok(())
            })
            .await;
            if let Err(rollback_err) = rollback {
                error!("Could not roll back task {task_id}: {rollback_err}");
            }
            Err(e)
        }
    }
}

async fn produce_asset(
    store: &dyn ContentStore,
    services: &AssetServices,
    task: &ContentTask,
    asset: AssetKind,
    prompt: Option<String>,
    skip_review: bool,
) -> Result<ContentTask, AppError> {
    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| default_prompt(task));

    let url = match asset {
        AssetKind::Image => {
            services
                .images
                .generate_image(ImageRequest {
                    prompt: &prompt,
                    aspect_ratio: AspectRatio::Portrait9x16,
                    reference_image: None,
                })
                .await?
        }
        AssetKind::Video => {
            services
                .videos
                .generate_video(ImageRequest {
                    prompt: &prompt,
                    aspect_ratio: AspectRatio::Portrait9x16,
                    reference_image: task.main_image_url.as_deref(),
                })
                .await?
        }
        AssetKind::Voice => {
            let blogger = store::require_blogger(store, task.blogger_id).await?;
            services
                .voices
                .synthesize_voice(VoiceRequest {
                    text: &prompt,
                    voice_id: blogger.voice_id.as_deref(),
                })
                .await?
        }
    };

    // voice audio is already in our bucket
    let url = match asset {
        AssetKind::Voice => url,
        _ => {
            let key = format!(
                "tasks/{}/{}-{}.{}",
                task.id,
                asset.as_str(),
                Uuid::new_v4(),
                asset.extension()
            );
            services.mirror.mirror(&url, &key).await
        }
    };

    store::update_task(store, task.id, |task| {
        task.preview_url = Some(url.clone());
        task.prompts.record(FrameKey::Preview, prompt);
        task.prompts.clear_error();
        task.generated_images.append(FrameKey::Preview, url);
        transition(
            task,
            TaskEvent::GenerationSucceeded {
                review: !skip_review,
            },
        )
    })
    .await
}

/// Explicit prompt, else script, else idea, else the content type.
fn default_prompt(task: &ContentTask) -> String {
    [task.script.as_deref(), task.idea.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or(&task.content_type)
        .to_string()
}
