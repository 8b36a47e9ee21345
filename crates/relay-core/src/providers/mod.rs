//! Provider clients for the supported generative-AI backends
//!
//! Each backend implements [`ProviderClient`]; the [`Dispatcher`] owns the
//! configured clients and satisfies the router's [`ProviderDispatch`] seam.

pub mod gemini;
pub mod grok;
pub mod huggingface;
pub mod stability;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::catalog::ProvidersConfig;
use crate::error::ProviderError;
use crate::router::ProviderDispatch;
use crate::task::{Candidate, ProviderId, RequestTask, RoutePayload};

pub use gemini::GeminiClient;
pub use grok::GrokClient;
pub use huggingface::HuggingFaceClient;
pub use stability::StabilityClient;

/// One backend's remote call, parameterized by model name
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider_id(&self) -> ProviderId;

    async fn invoke(
        &self,
        model: &str,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError>;
}

/// Holds the clients for every configured partition
pub struct Dispatcher {
    clients: HashMap<ProviderId, Box<dyn ProviderClient>>,
}

impl Dispatcher {
    /// Build clients for each partition present in the configuration.
    ///
    /// Key presence is validated by [`crate::catalog::Catalog::build`]; this
    /// only instantiates clients.
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        let mut clients: HashMap<ProviderId, Box<dyn ProviderClient>> = HashMap::new();
        if let Some(p) = &providers.gemini {
            clients.insert(
                ProviderId::Gemini,
                Box::new(GeminiClient::new(p.api_key.clone())),
            );
        }
        if let Some(p) = &providers.grok {
            clients.insert(ProviderId::Grok, Box::new(GrokClient::new(p.api_key.clone())));
        }
        if let Some(p) = &providers.huggingface {
            clients.insert(
                ProviderId::HuggingFace,
                Box::new(HuggingFaceClient::new(p.api_key.clone())),
            );
        }
        if let Some(p) = &providers.stability {
            clients.insert(
                ProviderId::Stability,
                Box::new(StabilityClient::new(p.api_key.clone())),
            );
        }
        Self { clients }
    }

    pub fn provider_count(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl ProviderDispatch for Dispatcher {
    async fn invoke(
        &self,
        candidate: &Candidate,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError> {
        let client = self
            .clients
            .get(&candidate.provider)
            .ok_or(ProviderError::NotConfigured(candidate.provider))?;
        client.invoke(&candidate.model, task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PartitionConfig;
    use crate::task::Capability;

    #[test]
    fn test_dispatcher_from_config() {
        let providers = ProvidersConfig {
            gemini: Some(PartitionConfig {
                api_key: "k".into(),
                ..Default::default()
            }),
            grok: None,
            huggingface: Some(PartitionConfig {
                api_key: "k".into(),
                ..Default::default()
            }),
            stability: None,
        };
        let dispatcher = Dispatcher::from_config(&providers);
        assert_eq!(dispatcher.provider_count(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_unconfigured_provider() {
        let dispatcher = Dispatcher::from_config(&ProvidersConfig::default());
        let candidate = Candidate {
            provider: ProviderId::Grok,
            model: "grok-2-latest".into(),
            capability: Capability::TextChat,
            priority: 0,
        };
        let err = dispatcher
            .invoke(&candidate, &RequestTask::chat("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(ProviderId::Grok)));
        assert!(!err.is_retryable());
    }
}
