//! Stability AI client — text-to-image via the v1 generation endpoint

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

const BASE_URL: &str = "https://api.stability.ai/v1/generation";

/// Stability AI client
pub struct StabilityClient {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for StabilityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityClient").finish()
    }
}

impl StabilityClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");
        Self { client, api_key }
    }

    fn from_response(resp: StabilityApiResponse) -> Result<RoutePayload, ProviderError> {
        let artifact = resp.artifacts.into_iter().next().ok_or_else(|| {
            ProviderError::Api {
                status: 200,
                message: "Stability response had no artifacts".to_string(),
            }
        })?;
        let data = BASE64.decode(&artifact.base64).map_err(|e| {
            ProviderError::Api {
                status: 200,
                message: format!("Stability artifact was not valid base64: {}", e),
            }
        })?;
        Ok(RoutePayload::Image {
            mime: "image/png".to_string(),
            data,
        })
    }
}

#[async_trait]
impl ProviderClient for StabilityClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Stability
    }

    async fn invoke(
        &self,
        model: &str,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError> {
        if task.capability != Capability::ImageGenerate {
            return Err(ProviderError::InvalidRequest(format!(
                "Stability client does not serve {}",
                task.capability
            )));
        }

        // `model` is a Stability engine id, e.g. "stable-diffusion-xl-1024-v1-0"
        let url = format!("{}/{}/text-to-image", BASE_URL, model);
        let body = StabilityRequest {
            text_prompts: vec![StabilityPrompt {
                text: task.prompt_or_default(""),
            }],
            samples: 1,
        };

        debug!("Stability request: engine={}", model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
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

        let api_response: StabilityApiResponse = response.json().await?;
        debug!(
            "Stability response: artifacts={}",
            api_response.artifacts.len()
        );
        Self::from_response(api_response)
    }
}

// ── Stability wire types ──

#[derive(Debug, Clone, Serialize)]
struct StabilityRequest {
    text_prompts: Vec<StabilityPrompt>,
    samples: u32,
}

#[derive(Debug, Clone, Serialize)]
struct StabilityPrompt {
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StabilityApiResponse {
    #[serde(default)]
    artifacts: Vec<StabilityArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
struct StabilityArtifact {
    base64: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_decodes_artifact() {
        let resp = StabilityApiResponse {
            artifacts: vec![StabilityArtifact {
                base64: BASE64.encode(b"fake-png-bytes"),
            }],
        };
        let payload = StabilityClient::from_response(resp).unwrap();
        match payload {
            RoutePayload::Image { mime, data } => {
                assert_eq!(mime, "image/png");
                assert_eq!(data, b"fake-png-bytes");
            }
            RoutePayload::Text(_) => panic!("expected image payload"),
        }
    }

    #[test]
    fn test_from_response_no_artifacts() {
        assert!(StabilityClient::from_response(StabilityApiResponse { artifacts: vec![] }).is_err());
    }

    #[test]
    fn test_from_response_bad_base64() {
        let resp = StabilityApiResponse {
            artifacts: vec![StabilityArtifact {
                base64: "not base64!!!".into(),
            }],
        };
        assert!(StabilityClient::from_response(resp).is_err());
    }

    #[tokio::test]
    async fn test_chat_capability_rejected() {
        let client = StabilityClient::new("sk-key".into());
        let err = client
            .invoke("stable-diffusion-xl-1024-v1-0", &RequestTask::chat("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = StabilityClient::new("sk-secret".into());
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }
}
