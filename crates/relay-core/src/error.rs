//! Structured error taxonomy for provider calls and routing
//!
//! Provider clients classify wire-level failures into [`ProviderError`] kinds
//! exactly once, at the HTTP boundary. The router switches on
//! [`ProviderError::is_retryable`], never on message text.

use reqwest::StatusCode;
use thiserror::Error;

use crate::task::{Capability, ProviderId};

/// A failure reported by (or while reaching) a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 429 or a quota/rate message — a different candidate may succeed
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The requested model does not exist or is not currently served
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// HTTP 503 while the model warms up (Hugging Face cold start)
    #[error("model loading: {0}")]
    ModelLoading(String),

    /// The request itself is malformed — retrying another model cannot help
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP 401/403 — bad or missing API key
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The catalog produced a candidate for a provider with no client built
    #[error("provider {0} is not configured")]
    NotConfigured(ProviderId),

    /// Any other provider-reported failure
    #[error("provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure before any provider response
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    /// Whether a different candidate in the same partition might succeed.
    ///
    /// Only capacity and availability errors justify falling through; a
    /// malformed request or bad key will fail identically on every model.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::ModelUnavailable(_) | Self::ModelLoading(_)
        )
    }
}

/// Map an HTTP error status and response body to a [`ProviderError`] kind.
///
/// Several providers report quota and availability problems only in free-text
/// bodies, so the substring heuristics live here, applied once per response.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("status {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        StatusCode::NOT_FOUND => ProviderError::ModelUnavailable(message),
        StatusCode::SERVICE_UNAVAILABLE => ProviderError::ModelLoading(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthFailure(message),
        StatusCode::BAD_REQUEST => {
            // Some providers tunnel quota errors through 400 bodies
            let lower = body.to_lowercase();
            if lower.contains("quota") || lower.contains("limit") {
                ProviderError::RateLimited(message)
            } else {
                ProviderError::InvalidRequest(message)
            }
        }
        _ => {
            let lower = body.to_lowercase();
            if lower.contains("quota") || lower.contains("limit") || lower.contains("429") {
                ProviderError::RateLimited(message)
            } else if lower.contains("not found")
                || lower.contains("model_not_found")
                || lower.contains("unavailable")
            {
                ProviderError::ModelUnavailable(message)
            } else if lower.contains("loading") {
                ProviderError::ModelLoading(message)
            } else {
                ProviderError::Api {
                    status: status.as_u16(),
                    message: body.trim().to_string(),
                }
            }
        }
    }
}

/// A routing call that could not begin
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The catalog holds no candidate for the task's capability
    #[error("no candidates available for capability {0}")]
    NoCandidates(Capability),
}

/// A catalog that cannot be built from the given configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Startup-time condition: an enabled partition needs its key
    #[error("provider {0} is enabled but has no API key configured")]
    MissingApiKey(ProviderId),

    #[error("unknown fallback provider '{0}'")]
    UnknownFallbackProvider(String),

    /// Only text-chat models of the fallback partition are ever routed to,
    /// so a chat-less fallback partition could never serve anything
    #[error("fallback provider {0} declares no chat models")]
    FallbackWithoutChatModels(ProviderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ProviderError::RateLimited("429".into()).is_retryable());
        assert!(ProviderError::ModelUnavailable("404".into()).is_retryable());
        assert!(ProviderError::ModelLoading("warming".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("bad field".into()).is_retryable());
        assert!(!ProviderError::AuthFailure("401".into()).is_retryable());
        assert!(
            !ProviderError::Api {
                status: 500,
                message: "boom".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_classify_status_codes() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "no such model"),
            ProviderError::ModelUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "loading"),
            ProviderError::ModelLoading(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            ProviderError::AuthFailure(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "missing field"),
            ProviderError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_classify_quota_in_body() {
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "You exceeded your quota"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "resource limit reached"),
            ProviderError::RateLimited(_)
        ));
        // 400 bodies carrying a bare "limit" are capacity errors, not
        // malformed requests
        let err = classify_status(StatusCode::BAD_REQUEST, "Request limit reached for this key");
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_unavailable_in_body() {
        assert!(matches!(
            classify_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "MODEL_NOT_FOUND: gemini-1.0"
            ),
            ProviderError::ModelUnavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "backend temporarily unavailable"),
            ProviderError::ModelUnavailable(_)
        ));
    }

    #[test]
    fn test_classify_opaque_error_is_fatal() {
        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, "unexpected shape");
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
        assert!(!err.is_retryable());
    }
}
