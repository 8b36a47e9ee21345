//! Gateway HTTP protocol — JSON request/response shapes and data-URI handling

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use relay_core::{Attachment, Capability};

/// What the client asks for; inferred from the body when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Chat,
    Analyze,
    Generate,
}

impl Mode {
    pub fn capability(self) -> Capability {
        match self {
            Self::Chat => Capability::TextChat,
            Self::Analyze => Capability::ImageAnalysis,
            Self::Generate => Capability::ImageGenerate,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Analyze => write!(f, "analyze"),
            Self::Generate => write!(f, "generate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Inbound chat request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Data-URIs: `data:<mime>;base64,<payload>`
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default, rename = "mediaType")]
    pub media_type: MediaType,
}

impl ChatRequest {
    /// Reject a body carrying neither a message nor any image
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let has_message = self.message.as_deref().is_some_and(|m| !m.is_empty());
        let has_images = self.images.as_deref().is_some_and(|i| !i.is_empty());
        if !has_message && !has_images {
            return Err(ProtocolError::EmptyRequest);
        }
        Ok(())
    }

    /// Explicit mode wins; otherwise images imply analysis
    pub fn resolved_mode(&self) -> Mode {
        if let Some(mode) = self.mode {
            return mode;
        }
        if self.images.as_deref().is_some_and(|i| !i.is_empty()) {
            Mode::Analyze
        } else {
            Mode::Chat
        }
    }

    /// Decode every image data-URI into an [`Attachment`]
    pub fn attachments(&self) -> Result<Vec<Attachment>, ProtocolError> {
        self.images
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|uri| parse_data_uri(uri))
            .collect()
    }
}

/// Outbound response body; failures are soft (HTTP 200, `success: false`)
/// so client UIs can render them inline in a conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub text: String,
    pub mode: String,
    #[serde(rename = "modelUsed", skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Winning provider id, set when the cross-provider fallback answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ChatResponse {
    pub fn failure(mode: Mode, text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
            mode: mode.to_string(),
            model_used: None,
            source: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("request must include a message or at least one image")]
    EmptyRequest,

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// Parse `data:<mime>;base64,<payload>` into an [`Attachment`]
pub fn parse_data_uri(uri: &str) -> Result<Attachment, ProtocolError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ProtocolError::InvalidDataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ProtocolError::InvalidDataUri("missing ',' separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ProtocolError::InvalidDataUri("only base64 data URIs are supported".to_string()))?;
    if mime.is_empty() {
        return Err(ProtocolError::InvalidDataUri("empty MIME type".to_string()));
    }
    let data = BASE64
        .decode(payload)
        .map_err(|e| ProtocolError::InvalidDataUri(format!("bad base64 payload: {}", e)))?;
    Ok(Attachment {
        mime: mime.to_string(),
        data,
    })
}

/// Encode an image payload back into a data-URI for the response body
pub fn to_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(data))
}
