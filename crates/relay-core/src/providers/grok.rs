//! Grok (x.ai) client — OpenAI-compatible chat completions, text only

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, classify_status};
use crate::task::{Capability, ProviderId, RequestTask, RoutePayload};

use super::ProviderClient;

const DEFAULT_BASE_URL: &str = "https://api.x.ai";
const MAX_TOKENS: u32 = 4096;

/// Grok client (x.ai)
pub struct GrokClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GrokClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrokClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GrokClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key,
            base_url,
        }
    }

    fn from_response(resp: GrokApiResponse) -> Result<RoutePayload, ProviderError> {
        let choice = resp.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Api {
                status: 200,
                message: "Grok response had no choices".to_string(),
            }
        })?;
        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(RoutePayload::Text(content)),
            _ => Err(ProviderError::Api {
                status: 200,
                message: "Grok response had empty content".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ProviderClient for GrokClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Grok
    }

    async fn invoke(
        &self,
        model: &str,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError> {
        if task.capability != Capability::TextChat {
            return Err(ProviderError::InvalidRequest(format!(
                "Grok client does not serve {}",
                task.capability
            )));
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = GrokRequest {
            model: model.to_string(),
            max_tokens: MAX_TOKENS,
            messages: vec![GrokMessage {
                role: "user".to_string(),
                content: task.prompt_or_default(""),
            }],
        };

        debug!("Grok request: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &error_text));
        }

        let api_response: GrokApiResponse = response.json().await?;
        debug!("Grok response: choices={}", api_response.choices.len());
        Self::from_response(api_response)
    }
}

// ── Grok wire types (OpenAI-compatible) ──

#[derive(Debug, Clone, Serialize)]
struct GrokRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<GrokMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct GrokMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GrokApiResponse {
    #[serde(default)]
    choices: Vec<GrokChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct GrokChoice {
    message: GrokChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct GrokChoiceMessage {
    content: Option<String>,
}
