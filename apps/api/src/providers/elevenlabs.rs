/// ElevenLabs text-to-speech. The API streams back MP3 bytes rather than a URL,
/// so the audio is written to object storage and the stored URL is returned.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::providers::{ObjectStorage, ProviderError, VoiceGenerator, VoiceRequest};

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const MODEL_ID: &str = "eleven_multilingual_v2";
/// Used when the blogger has no voice configured.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    storage: Arc<dyn ObjectStorage>,
}

impl ElevenLabsClient {
    pub fn new(client: Client, api_key: Option<String>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            client,
            api_key,
            storage,
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::Configuration("ELEVENLABS_API_KEY"))
    }
}

#[async_trait]
impl VoiceGenerator for ElevenLabsClient {
    fn check_configured(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }

    async fn synthesize_voice(&self, request: VoiceRequest<'_>) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let voice_id = request
            .voice_id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_VOICE_ID);

        let response = self
            .client
            .post(format!("{ELEVENLABS_API_URL}/{voice_id}"))
            .header("xi-api-key", api_key)
            .header("accept", "audio/mpeg")
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "text": request.text, "model_id": MODEL_ID }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "elevenlabs",
                status: status.as_u16(),
                message,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::EmptyResult {
                provider: "elevenlabs",
            });
        }

        info!("Synthesized {} bytes of audio with voice {voice_id}", audio.len());
        let key = format!("voice/{}.mp3", Uuid::new_v4());
        self.storage.store(audio, &key, "audio/mpeg").await
    }
}
