//! Candidate catalog — the static, read-only list of (provider, model) pairs
//!
//! The catalog is data, not code: each provider partition declares its model
//! lists in configuration, in priority order. It is built once at startup and
//! only read afterwards.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::task::{Candidate, Capability, ProviderId};

/// One provider partition as declared in configuration.
///
/// Model lists are in priority order: index 0 is tried first.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct PartitionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub chat_models: Vec<String>,
    #[serde(default)]
    pub vision_models: Vec<String>,
    #[serde(default)]
    pub image_models: Vec<String>,
}

impl std::fmt::Debug for PartitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("chat_models", &self.chat_models)
            .field("vision_models", &self.vision_models)
            .field("image_models", &self.image_models)
            .finish()
    }
}

/// All provider partitions; absent partitions are disabled
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: Option<PartitionConfig>,
    #[serde(default)]
    pub grok: Option<PartitionConfig>,
    #[serde(default)]
    pub huggingface: Option<PartitionConfig>,
    #[serde(default)]
    pub stability: Option<PartitionConfig>,
}

impl ProvidersConfig {
    pub fn partition(&self, provider: ProviderId) -> Option<&PartitionConfig> {
        match provider {
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::Grok => self.grok.as_ref(),
            ProviderId::HuggingFace => self.huggingface.as_ref(),
            ProviderId::Stability => self.stability.as_ref(),
        }
    }
}

/// Router knobs and the cross-provider fallback partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Partition re-routed to after the primary family is exhausted;
    /// empty disables cross-provider fallback
    #[serde(default)]
    pub fallback_provider: String,
}

fn default_max_attempts() -> usize {
    5
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            fallback_provider: String::new(),
        }
    }
}

/// The built catalog: every declared candidate plus the fallback partition id
#[derive(Debug, Clone)]
pub struct Catalog {
    candidates: Vec<Candidate>,
    fallback_provider: Option<ProviderId>,
}

const ALL_PROVIDERS: [ProviderId; 4] = [
    ProviderId::Gemini,
    ProviderId::Grok,
    ProviderId::HuggingFace,
    ProviderId::Stability,
];

impl Catalog {
    /// Build the catalog from configuration.
    ///
    /// A partition that is declared but has no API key is a startup error,
    /// never a per-request one.
    pub fn build(providers: &ProvidersConfig, router: &RouterConfig) -> Result<Self, CatalogError> {
        let mut candidates = Vec::new();

        for provider in ALL_PROVIDERS {
            let Some(partition) = providers.partition(provider) else {
                continue;
            };
            if partition.api_key.is_empty() {
                return Err(CatalogError::MissingApiKey(provider));
            }
            push_models(&mut candidates, provider, Capability::TextChat, &partition.chat_models);
            push_models(
                &mut candidates,
                provider,
                Capability::ImageAnalysis,
                &partition.vision_models,
            );
            push_models(
                &mut candidates,
                provider,
                Capability::ImageGenerate,
                &partition.image_models,
            );
        }

        let fallback_provider = if router.fallback_provider.is_empty() {
            None
        } else {
            let id = parse_provider(&router.fallback_provider).ok_or_else(|| {
                CatalogError::UnknownFallbackProvider(router.fallback_provider.clone())
            })?;
            // A fallback partition is only ever routed to for text chat, so
            // one without chat models is a configuration mistake
            if let Some(partition) = providers.partition(id) {
                if partition.chat_models.is_empty() {
                    return Err(CatalogError::FallbackWithoutChatModels(id));
                }
            }
            Some(id)
        };

        Ok(Self {
            candidates,
            fallback_provider,
        })
    }

    /// Candidates for a capability, excluding the fallback partition.
    ///
    /// The primary and fallback catalogs are never merged: their failure
    /// semantics and payload shapes differ.
    pub fn primary(&self, capability: Capability) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|c| {
                c.capability == capability && Some(c.provider) != self.fallback_provider
            })
            .cloned()
            .collect()
    }

    /// Text-chat candidates of the fallback partition; empty when fallback
    /// is disabled or the partition declares no chat models
    pub fn fallback_chat(&self) -> Vec<Candidate> {
        let Some(fallback) = self.fallback_provider else {
            return Vec::new();
        };
        self.candidates
            .iter()
            .filter(|c| c.provider == fallback && c.capability == Capability::TextChat)
            .cloned()
            .collect()
    }

    pub fn fallback_provider(&self) -> Option<ProviderId> {
        self.fallback_provider
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate count per capability, for the status endpoint
    pub fn summary(&self) -> serde_json::Value {
        let count = |cap: Capability| self.candidates.iter().filter(|c| c.capability == cap).count();
        serde_json::json!({
            "candidates": self.len(),
            "chat": count(Capability::TextChat),
            "analyze": count(Capability::ImageAnalysis),
            "generate": count(Capability::ImageGenerate),
            "fallback_provider": self.fallback_provider.map(|p| p.to_string()),
        })
    }
}

fn push_models(
    candidates: &mut Vec<Candidate>,
    provider: ProviderId,
    capability: Capability,
    models: &[String],
) {
    for (index, model) in models.iter().enumerate() {
        candidates.push(Candidate {
            provider,
            model: model.clone(),
            capability,
            priority: index as u32,
        });
    }
}

pub fn parse_provider(name: &str) -> Option<ProviderId> {
    match name.to_lowercase().as_str() {
        "gemini" => Some(ProviderId::Gemini),
        "grok" => Some(ProviderId::Grok),
        "huggingface" => Some(ProviderId::HuggingFace),
        "stability" => Some(ProviderId::Stability),
        _ => None,
    }
}

/// Mask a secret for Debug output: first 3 and last 4 chars for long keys
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(key: &str, chat: &[&str], vision: &[&str], image: &[&str]) -> PartitionConfig {
        PartitionConfig {
            api_key: key.to_string(),
            chat_models: chat.iter().map(|s| s.to_string()).collect(),
            vision_models: vision.iter().map(|s| s.to_string()).collect(),
            image_models: image.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sample_providers() -> ProvidersConfig {
        ProvidersConfig {
            gemini: Some(partition(
                "AIza-test",
                &["gemini-2.0-flash", "gemini-1.5-flash"],
                &["gemini-2.0-flash"],
                &[],
            )),
            grok: Some(partition("xai-test", &["grok-2-latest"], &[], &[])),
            huggingface: Some(partition(
                "hf-test",
                &[],
                &[],
                &["stabilityai/sdxl", "runwayml/sd-v1-5"],
            )),
            stability: None,
        }
    }

    #[test]
    fn test_build_catalog() {
        let router = RouterConfig {
            fallback_provider: "grok".into(),
            ..Default::default()
        };
        let catalog = Catalog::build(&sample_providers(), &router).unwrap();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.fallback_provider(), Some(ProviderId::Grok));
    }

    #[test]
    fn test_primary_excludes_fallback_partition() {
        let router = RouterConfig {
            fallback_provider: "grok".into(),
            ..Default::default()
        };
        let catalog = Catalog::build(&sample_providers(), &router).unwrap();
        let chat = catalog.primary(Capability::TextChat);
        assert_eq!(chat.len(), 2);
        assert!(chat.iter().all(|c| c.provider == ProviderId::Gemini));
        // Declaration order becomes priority order
        assert_eq!(chat[0].model, "gemini-2.0-flash");
        assert_eq!(chat[0].priority, 0);
        assert_eq!(chat[1].priority, 1);
    }

    #[test]
    fn test_fallback_chat_candidates() {
        let router = RouterConfig {
            fallback_provider: "grok".into(),
            ..Default::default()
        };
        let catalog = Catalog::build(&sample_providers(), &router).unwrap();
        let fallback = catalog.fallback_chat();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].model, "grok-2-latest");
    }

    #[test]
    fn test_fallback_disabled() {
        let catalog = Catalog::build(&sample_providers(), &RouterConfig::default()).unwrap();
        assert!(catalog.fallback_provider().is_none());
        assert!(catalog.fallback_chat().is_empty());
        // Without a fallback partition, grok candidates are primary
        assert_eq!(catalog.primary(Capability::TextChat).len(), 3);
    }

    #[test]
    fn test_missing_api_key_is_startup_error() {
        let providers = ProvidersConfig {
            gemini: Some(partition("", &["gemini-2.0-flash"], &[], &[])),
            ..Default::default()
        };
        let err = Catalog::build(&providers, &RouterConfig::default()).unwrap_err();
        assert_eq!(err, CatalogError::MissingApiKey(ProviderId::Gemini));
    }

    #[test]
    fn test_chatless_fallback_partition_rejected() {
        // Stability declares only image models, so its candidates would be
        // stranded behind a chat-only fallback route
        let mut providers = sample_providers();
        providers.stability = Some(partition(
            "sk-test",
            &[],
            &[],
            &["stable-diffusion-xl-1024-v1-0"],
        ));
        let router = RouterConfig {
            fallback_provider: "stability".into(),
            ..Default::default()
        };
        let err = Catalog::build(&providers, &router).unwrap_err();
        assert_eq!(
            err,
            CatalogError::FallbackWithoutChatModels(ProviderId::Stability)
        );
    }

    #[test]
    fn test_unknown_fallback_provider() {
        let router = RouterConfig {
            fallback_provider: "openai".into(),
            ..Default::default()
        };
        let err = Catalog::build(&sample_providers(), &router).unwrap_err();
        assert_eq!(err, CatalogError::UnknownFallbackProvider("openai".into()));
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("gemini"), Some(ProviderId::Gemini));
        assert_eq!(parse_provider("Grok"), Some(ProviderId::Grok));
        assert_eq!(parse_provider("nope"), None);
    }

    #[test]
    fn test_partition_debug_hides_key() {
        let p = partition("hf_secret_key_123", &[], &[], &["m"]);
        let debug = format!("{:?}", p);
        assert!(!debug.contains("hf_secret_key_123"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("AIzaSyExample1234"), "AIz...1234");
    }
}
