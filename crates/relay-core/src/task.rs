//! Core task and candidate types shared across the router and providers

use serde::{Deserialize, Serialize};

/// Which third-party provider serves a candidate model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    Grok,
    HuggingFace,
    Stability,
}

/// The category of work a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    TextChat,
    ImageAnalysis,
    ImageGenerate,
}

/// One (provider, model) pair eligible to serve a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub provider: ProviderId,
    pub model: String,
    pub capability: Capability,
    /// Lower priority is tried first; ties keep catalog declaration order
    pub priority: u32,
}

/// A binary image payload with its declared MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime: String,
    pub data: Vec<u8>,
}

/// The unit of work submitted to the router.
///
/// The caller guarantees `prompt` is non-empty for text chat and that
/// `attachments` is non-empty for image analysis; the router does not
/// re-validate.
#[derive(Debug, Clone)]
pub struct RequestTask {
    pub capability: Capability,
    pub prompt: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl RequestTask {
    /// A pure text task with no attachments
    pub fn chat(prompt: impl Into<String>) -> Self {
        Self {
            capability: Capability::TextChat,
            prompt: Some(prompt.into()),
            attachments: Vec::new(),
        }
    }

    pub fn prompt_or_default(&self, default: &str) -> String {
        match &self.prompt {
            Some(p) if !p.is_empty() => p.clone(),
            _ => default.to_string(),
        }
    }
}

/// What a winning candidate produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePayload {
    Text(String),
    Image { mime: String, data: Vec<u8> },
}

impl RoutePayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Image { .. } => None,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Grok => write!(f, "grok"),
            Self::HuggingFace => write!(f, "huggingface"),
            Self::Stability => write!(f, "stability"),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextChat => write!(f, "text-chat"),
            Self::ImageAnalysis => write!(f, "image-analysis"),
            Self::ImageGenerate => write!(f, "image-generate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_display() {
        assert_eq!(ProviderId::Gemini.to_string(), "gemini");
        assert_eq!(ProviderId::HuggingFace.to_string(), "huggingface");
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::TextChat.to_string(), "text-chat");
        assert_eq!(Capability::ImageGenerate.to_string(), "image-generate");
    }

    #[test]
    fn test_chat_task() {
        let task = RequestTask::chat("hello");
        assert_eq!(task.capability, Capability::TextChat);
        assert_eq!(task.prompt.as_deref(), Some("hello"));
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn test_prompt_or_default() {
        let mut task = RequestTask::chat("hi");
        assert_eq!(task.prompt_or_default("fallback"), "hi");
        task.prompt = None;
        assert_eq!(task.prompt_or_default("fallback"), "fallback");
        task.prompt = Some(String::new());
        assert_eq!(task.prompt_or_default("fallback"), "fallback");
    }

    #[test]
    fn test_payload_as_text() {
        assert_eq!(RoutePayload::Text("hi".into()).as_text(), Some("hi"));
        let img = RoutePayload::Image {
            mime: "image/png".into(),
            data: vec![1, 2],
        };
        assert!(img.as_text().is_none());
    }
}
