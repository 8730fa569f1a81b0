use std::sync::Arc;

use crate::fashion::pipeline::FramePipeline;
use crate::jobs::queue::JobQueue;
use crate::providers::{
    AssetMirror, ImageGenerator, ObjectStorage, TextGenerator, VideoGenerator, VoiceGenerator,
};
use crate::store::ContentStore;
use crate::tasks::generation::AssetServices;

/// Shared application state injected into all route handlers via Axum
/// extractors and handed to the background workers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub jobs: Arc<dyn JobQueue>,
    /// Fails soft: a missing key yields placeholder text.
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    pub voices: Arc<dyn VoiceGenerator>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mirror: Arc<dyn AssetMirror>,
}

impl AppState {
    pub fn frame_pipeline(&self) -> FramePipeline<'_> {
        FramePipeline::new(
            self.store.as_ref(),
            self.text.as_ref(),
            self.images.as_ref(),
            self.mirror.as_ref(),
        )
    }

    pub fn asset_services(&self) -> AssetServices {
        AssetServices {
            images: self.images.clone(),
            videos: self.videos.clone(),
            voices: self.voices.clone(),
            mirror: self.mirror.clone(),
        }
    }
}
