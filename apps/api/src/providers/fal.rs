/// FAL.ai client for image and video generation.
///
/// Fails hard: every error is a [`ProviderError`] for the caller to handle.
/// Returned URLs are short-lived and should be mirrored into object storage.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::providers::{ImageGenerator, ImageRequest, ProviderError, VideoGenerator};

const FAL_BASE_URL: &str = "https://fal.run";
const TEXT_TO_IMAGE: &str = "fal-ai/bytedance/seedream/v4/text-to-image";
const IMAGE_EDIT: &str = "fal-ai/bytedance/seedream/v4/edit";
const TEXT_TO_VIDEO: &str = "fal-ai/kling-video/v2.1/standard/text-to-video";
const IMAGE_TO_VIDEO: &str = "fal-ai/kling-video/v2.1/standard/image-to-video";

const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);
const VIDEO_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct ImageSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct ImagePayload<'a> {
    prompt: &'a str,
    image_size: ImageSize,
    num_images: u32,
    enable_safety_checker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_urls: Option<[&'a str; 1]>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    images: Vec<FalFile>,
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    video: Option<FalFile>,
}

#[derive(Debug, Deserialize)]
struct FalFile {
    url: String,
}

#[derive(Clone)]
pub struct FalClient {
    client: Client,
    api_key: Option<String>,
}

impl FalClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::Configuration("FAL_API_KEY"))
    }

    async fn run<P: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        model: &str,
        payload: &P,
        timeout: Duration,
    ) -> Result<R, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(format!("{FAL_BASE_URL}/{model}"))
            .header("Authorization", format!("Key {api_key}"))
            .timeout(timeout)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "fal",
                status: status.as_u16(),
                message,
            });
        }

        debug!("FAL.ai {model} returned {status}");
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ImageGenerator for FalClient {
    fn check_configured(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }

    async fn generate_image(&self, request: ImageRequest<'_>) -> Result<String, ProviderError> {
        let (width, height) = request.aspect_ratio.dimensions();
        let model = match request.reference_image {
            Some(_) => IMAGE_EDIT,
            None => TEXT_TO_IMAGE,
        };
        let payload = ImagePayload {
            prompt: request.prompt,
            image_size: ImageSize { width, height },
            num_images: 1,
            enable_safety_checker: false,
            image_urls: request.reference_image.map(|url| [url]),
        };

        info!(
            "Generating {} image via {model}",
            request.aspect_ratio.as_str()
        );
        let response: ImageResponse = self.run(model, &payload, IMAGE_TIMEOUT).await?;
        response
            .images
            .into_iter()
            .next()
            .map(|f| f.url)
            .ok_or(ProviderError::EmptyResult { provider: "fal" })
    }
}

#[async_trait]
impl VideoGenerator for FalClient {
    fn check_configured(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }

    async fn generate_video(&self, request: ImageRequest<'_>) -> Result<String, ProviderError> {
        let (model, payload) = match request.reference_image {
            Some(image_url) => (
                IMAGE_TO_VIDEO,
                json!({ "prompt": request.prompt, "image_url": image_url }),
            ),
            None => (
                TEXT_TO_VIDEO,
                json!({
                    "prompt": request.prompt,
                    "aspect_ratio": request.aspect_ratio.as_str(),
                }),
            ),
        };

        info!("Generating video via {model}");
        let response: VideoResponse = self.run(model, &payload, VIDEO_TIMEOUT).await?;
        response
            .video
            .map(|f| f.url)
            .ok_or(ProviderError::EmptyResult { provider: "fal" })
    }
}
