//! External generative-AI and storage collaborators.
//!
//! Each capability is a trait so the core never names a vendor. The contracts
//! differ on purpose and the types say which is which:
//!
//! - text generation fails soft: [`TextGenerator`] returns a [`TextOutcome`],
//!   never an error, and a `Fallback` carries a placeholder plus the reason;
//! - image, video, voice and object storage fail hard with [`ProviderError`];
//! - asset mirroring fails soft: [`AssetMirror`] hands back the original URL.
//!
//! Missing credentials surface as [`ProviderError::Configuration`] from
//! `check_configured`, before any network call is made.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod elevenlabs;
pub mod fal;
#[cfg(test)]
pub mod fakes;
pub mod openai;
pub mod storage;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not set")]
    Configuration(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned no result")]
    EmptyResult { provider: &'static str },

    #[error("Storage error: {0}")]
    Storage(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct TextRequest<'a> {
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    Generated(String),
    /// The provider was unavailable; `text` is a deterministic placeholder.
    Fallback { text: String, reason: String },
}

/// Placeholder returned when no text provider answered.
pub fn placeholder_text(prompt: &str) -> String {
    format!("[AI Draft] {prompt}")
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, request: TextRequest<'_>) -> TextOutcome;
}

// ────────────────────────────────────────────────────────────────────────────
// Image / video / voice
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }

    /// Output size in pixels, 1080 on the short edge.
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Portrait9x16 => (1080, 1920),
            AspectRatio::Portrait4x5 => (1080, 1350),
            AspectRatio::Portrait3x4 => (1080, 1440),
            AspectRatio::Landscape16x9 => (1920, 1080),
        }
    }
}

/// `reference_image` switches the provider into edit mode.
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub aspect_ratio: AspectRatio,
    pub reference_image: Option<&'a str>,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn check_configured(&self) -> Result<(), ProviderError>;

    /// Returns the (possibly short-lived) URL of the generated image.
    async fn generate_image(&self, request: ImageRequest<'_>) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    fn check_configured(&self) -> Result<(), ProviderError>;

    async fn generate_video(&self, request: ImageRequest<'_>) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceRequest<'a> {
    pub text: &'a str,
    pub voice_id: Option<&'a str>,
}

#[async_trait]
pub trait VoiceGenerator: Send + Sync {
    fn check_configured(&self) -> Result<(), ProviderError>;

    /// Returns a durable URL of the synthesized audio.
    async fn synthesize_voice(&self, request: VoiceRequest<'_>) -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Storage
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the bytes under `key` and returns the permanent public URL.
    async fn store(&self, data: Bytes, key: &str, content_type: &str)
        -> Result<String, ProviderError>;
}

#[async_trait]
pub trait AssetMirror: Send + Sync {
    /// Copies an expiring provider URL into durable storage. On any failure
    /// the original URL is returned unchanged.
    async fn mirror(&self, url: &str, key: &str) -> String;
}
