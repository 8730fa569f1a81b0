//! Hand-written collaborator fakes for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::providers::{
    placeholder_text, AspectRatio, AssetMirror, ImageGenerator, ImageRequest, ObjectStorage,
    ProviderError, TextGenerator, TextOutcome, TextRequest, VideoGenerator, VoiceGenerator,
    VoiceRequest,
};

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

/// Replays queued outcomes, then falls back to `default` (or the placeholder).
#[derive(Default)]
pub struct ScriptedText {
    queued: Mutex<VecDeque<TextOutcome>>,
    default: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedText {
    pub fn always(text: &str) -> Self {
        Self {
            default: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Behaves like a text provider with no credentials.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn then(self, outcome: TextOutcome) -> Self {
        self.queued.lock().unwrap().push_back(outcome);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate_text(&self, request: TextRequest<'_>) -> TextOutcome {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        if let Some(next) = self.queued.lock().unwrap().pop_front() {
            return next;
        }
        match &self.default {
            Some(text) => TextOutcome::Generated(text.clone()),
            None => TextOutcome::Fallback {
                text: placeholder_text(request.prompt),
                reason: "OPENAI_API_KEY is not set".into(),
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Image / video / voice
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImage {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference_image: Option<String>,
}

/// Image generator that records every request. Calls numbered `fail_from`
/// and later (zero-based) fail with an API error.
#[derive(Default)]
pub struct RecordingImages {
    calls: Mutex<Vec<RecordedImage>>,
    fail_from: Option<usize>,
    unconfigured: bool,
}

impl RecordingImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self::failing_from(0)
    }

    pub fn failing_from(call: usize) -> Self {
        Self {
            fail_from: Some(call),
            ..Self::default()
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedImage> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for RecordingImages {
    fn check_configured(&self) -> Result<(), ProviderError> {
        if self.unconfigured {
            return Err(ProviderError::Configuration("FAL_API_KEY"));
        }
        Ok(())
    }

    async fn generate_image(&self, request: ImageRequest<'_>) -> Result<String, ProviderError> {
        self.check_configured()?;
        let mut calls = self.calls.lock().unwrap();
        let n = calls.len();
        calls.push(RecordedImage {
            prompt: request.prompt.to_string(),
            aspect_ratio: request.aspect_ratio,
            reference_image: request.reference_image.map(String::from),
        });
        if self.fail_from.is_some_and(|from| n >= from) {
            return Err(ProviderError::Api {
                provider: "fal",
                status: 500,
                message: "upstream exploded".into(),
            });
        }
        Ok(format!("https://fal.test/image-{n}.jpg"))
    }
}

/// Video and voice generator returning fixed URLs, or failing when built with
/// `failing()`.
#[derive(Default)]
pub struct StaticMedia {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl StaticMedia {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn produce(&self, prompt: &str, url: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(ProviderError::EmptyResult { provider: "fake" });
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl VideoGenerator for StaticMedia {
    fn check_configured(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn generate_video(&self, request: ImageRequest<'_>) -> Result<String, ProviderError> {
        self.produce(request.prompt, "https://fal.test/video.mp4")
    }
}

#[async_trait]
impl VoiceGenerator for StaticMedia {
    fn check_configured(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn synthesize_voice(&self, request: VoiceRequest<'_>) -> Result<String, ProviderError> {
        self.produce(request.text, "https://storage.test/voice/take.mp3")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Storage
// ────────────────────────────────────────────────────────────────────────────

/// Keeps stored keys in memory; mirrored URLs come back as `https://storage.test/{key}`.
#[derive(Default)]
pub struct MemoryStorage {
    keys: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn store(
        &self,
        _data: Bytes,
        key: &str,
        _content_type: &str,
    ) -> Result<String, ProviderError> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(format!("https://storage.test/{key}"))
    }
}

#[async_trait]
impl AssetMirror for MemoryStorage {
    async fn mirror(&self, _url: &str, key: &str) -> String {
        self.keys.lock().unwrap().push(key.to_string());
        format!("https://storage.test/{key}")
    }
}
