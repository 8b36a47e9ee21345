//! Hugging Face Inference API client — text-to-image generation
//!
//! Cold models answer 503 with an `estimated_time` body while they warm up;
//! that maps to [`ProviderError::ModelLoading`] so the router moves on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, classify_status};
use crate::task::{Capability, ProviderId, RequestTask, RoutePayload};

use super::ProviderClient;

const BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Hugging Face Inference API client
pub struct HuggingFaceClient {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClient").finish()
    }
}

impl HuggingFaceClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, api_key }
    }
}

#[async_trait]
impl ProviderClient for HuggingFaceClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }

    async fn invoke(
        &self,
        model: &str,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError> {
        if task.capability != Capability::ImageGenerate {
            return Err(ProviderError::InvalidRequest(format!(
                "Hugging Face client does not serve {}",
                task.capability
            )));
        }

        let url = format!("{}/{}", BASE_URL, model);
        let body = HfRequest {
            inputs: task.prompt_or_default(""),
        };

        debug!("Hugging Face request: model={}", model);

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
            if status == StatusCode::SERVICE_UNAVAILABLE {
                // Warm-up body: {"error": "...", "estimated_time": 20.0}
                let detail = serde_json::from_str::<HfErrorBody>(&error_text)
                    .map(|e| match e.estimated_time {
                        Some(t) => format!("{} (estimated {}s)", e.error, t),
                        None => e.error,
                    })
                    .unwrap_or(error_text);
                return Err(ProviderError::ModelLoading(detail));
            }
            return Err(classify_status(status, &error_text));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Err(ProviderError::Api {
                status: 200,
                message: "Hugging Face returned an empty image".to_string(),
            });
        }

        debug!("Hugging Face response: {} bytes ({})", data.len(), mime);
        Ok(RoutePayload::Image { mime, data })
    }
}

// ── Hugging Face wire types ──

#[derive(Debug, Clone, Serialize)]
struct HfRequest {
    inputs: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HfErrorBody {
    error: String,
    #[serde(default)]
    estimated_time: Option<f64>,
}
