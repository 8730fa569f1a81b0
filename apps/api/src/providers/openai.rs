/// OpenAI chat-completions client behind the [`TextGenerator`] port.
///
/// Fails soft: a missing key, transport error, non-2xx status or empty
/// completion all come back as [`TextOutcome::Fallback`] with a reason, and
/// the caller keeps going with the placeholder. There is no retry loop.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::{placeholder_text, ProviderError, TextGenerator, TextOutcome, TextRequest};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Used when the caller does not supply a system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that writes concise social media scripts.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

impl ChatResponse {
    fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: TextRequest<'_>) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Configuration("OPENAI_API_KEY"))?;

        let system = if request.system.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            request.system
        };
        let body = ChatRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: TEMPERATURE,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                provider: "openai",
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        if let Some(usage) = &chat.usage {
            debug!(
                "OpenAI call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat.text()
            .map(String::from)
            .ok_or(ProviderError::EmptyResult { provider: "openai" })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, request: TextRequest<'_>) -> TextOutcome {
        match self.complete(request).await {
            Ok(text) => TextOutcome::Generated(text),
            Err(e) => {
                warn!("Text generation unavailable, using placeholder: {e}");
                TextOutcome::Fallback {
                    text: placeholder_text(request.prompt),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
