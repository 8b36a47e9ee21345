//! Google Gemini client — text chat and multimodal image analysis

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, classify_status};
use crate::task::{Capability, ProviderId, RequestTask, RoutePayload};

use super::ProviderClient;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Google Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, api_key }
    }

    /// Map a task to Gemini request parts: the prompt first, then one
    /// `inline_data` part per attachment
    fn to_parts(task: &RequestTask) -> Vec<GeminiPart> {
        let prompt = match task.capability {
            Capability::ImageAnalysis => {
                task.prompt_or_default("Describe this image in detail.")
            }
            _ => task.prompt_or_default(""),
        };
        let mut parts = vec![GeminiPart::Text { text: prompt }];
        for attachment in &task.attachments {
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: attachment.mime.clone(),
                    data: BASE64.encode(&attachment.data),
                },
            });
        }
        parts
    }

    fn from_response(resp: GeminiApiResponse) -> Result<RoutePayload, ProviderError> {
        let candidate = resp.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::Api {
                status: 200,
                message: "Gemini response had no candidates".to_string(),
            }
        })?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| match p {
                GeminiPart::Text { text } => Some(text),
                GeminiPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "Gemini response had no text parts".to_string(),
            });
        }
        Ok(RoutePayload::Text(text))
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn invoke(
        &self,
        model: &str,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError> {
        if task.capability == Capability::ImageGenerate {
            return Err(ProviderError::InvalidRequest(
                "Gemini client does not serve image generation".to_string(),
            ));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            BASE_URL, model, self.api_key
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: Self::to_parts(task),
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        debug!(
            "Gemini request: model={}, attachments={}",
            model,
            task.attachments.len()
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &error_text));
        }

        let api_response: GeminiApiResponse = response.json().await?;
        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );
        Self::from_response(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}
