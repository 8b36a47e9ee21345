//! Request orchestration — primary routing plus cross-provider fallback
//!
//! The fallback is a second, independent `route` call against the fallback
//! partition's text-chat candidates; the two catalogs are never merged
//! because their failure semantics and payload shapes differ. Image tasks
//! degrade to a text-only restatement since the fallback family has no
//! image capability.

use thiserror::Error;
use tracing::{info, warn};

use relay_core::{Capability, RequestTask, RouteError, RoutePayload, RouteResult};

use crate::protocol::{ChatRequest, ChatResponse, MediaType, Mode, to_data_uri};
use crate::server::GatewayState;

/// A request that could not produce a handled outcome
#[derive(Debug, Error)]
pub enum HandleError {
    /// Maps to HTTP 400
    #[error("{0}")]
    BadRequest(String),

    /// Maps to HTTP 500 — configuration gaps and programming errors only
    #[error("{0}")]
    Internal(String),
}

/// Resolve one chat request to a response.
///
/// Provider failures never escape as errors: they become `success: false`
/// responses so clients can render them inline. Only validation failures and
/// an empty catalog surface as [`HandleError`].
pub async fn handle_chat(
    state: &GatewayState,
    req: &ChatRequest,
) -> Result<ChatResponse, HandleError> {
    req.validate()
        .map_err(|e| HandleError::BadRequest(e.to_string()))?;

    let mode = req.resolved_mode();

    // Video generation was never backed by a real provider; say so instead
    // of burning attempts
    if mode == Mode::Generate && req.media_type == MediaType::Video {
        return Ok(ChatResponse::failure(
            mode,
            "Video generation is not currently supported.",
        ));
    }

    let task = build_task(req, mode)?;
    let primary = state.catalog.primary(task.capability);

    let result = match state.router.route(state.dispatch.as_ref(), &task, &primary).await {
        Ok(result) => result,
        Err(RouteError::NoCandidates(cap)) => {
            return Err(HandleError::Internal(format!(
                "no candidates available for capability {}",
                cap
            )));
        }
    };

    if result.succeeded {
        return Ok(success_response(mode, &result, None));
    }

    // Primary family done (exhausted or cut short by a fatal error); the
    // cross-provider fallback may still be worth one more pass
    if let Some(fallback_result) = try_fallback(state, &task).await {
        if fallback_result.succeeded {
            let source = state.catalog.fallback_provider().map(|p| p.to_string());
            return Ok(success_response(mode, &fallback_result, source));
        }
        warn!(
            "Cross-provider fallback also failed after {} attempts",
            fallback_result.attempts.len()
        );
    }

    Ok(ChatResponse::failure(mode, exhaustion_text(mode, &result)))
}

fn build_task(req: &ChatRequest, mode: Mode) -> Result<RequestTask, HandleError> {
    let attachments = req
        .attachments()
        .map_err(|e| HandleError::BadRequest(e.to_string()))?;
    let message = req.message.clone().filter(|m| !m.is_empty());

    match mode {
        Mode::Chat => {
            let prompt = message
                .ok_or_else(|| HandleError::BadRequest("chat requires a message".to_string()))?;
            Ok(RequestTask::chat(prompt))
        }
        Mode::Analyze => {
            if attachments.is_empty() {
                return Err(HandleError::BadRequest(
                    "analyze requires at least one image".to_string(),
                ));
            }
            Ok(RequestTask {
                capability: Capability::ImageAnalysis,
                prompt: message,
                attachments,
            })
        }
        Mode::Generate => {
            let prompt = message.ok_or_else(|| {
                HandleError::BadRequest("generate requires a prompt message".to_string())
            })?;
            Ok(RequestTask {
                capability: Capability::ImageGenerate,
                prompt: Some(prompt),
                attachments: Vec::new(),
            })
        }
    }
}

/// Run the independent fallback route, if one is configured
async fn try_fallback(state: &GatewayState, task: &RequestTask) -> Option<RouteResult> {
    let fallback_catalog = state.catalog.fallback_chat();
    if fallback_catalog.is_empty() {
        return None;
    }

    let reframed = RequestTask::chat(reframe_prompt(task));
    info!(
        "Primary partition failed for {}; re-routing to fallback partition",
        task.capability
    );
    state
        .router
        .route(state.dispatch.as_ref(), &reframed, &fallback_catalog)
        .await
        .ok()
}

/// Restate an image task as plain text for the image-less fallback family
fn reframe_prompt(task: &RequestTask) -> String {
    match task.capability {
        Capability::TextChat => task.prompt_or_default(""),
        Capability::ImageAnalysis => format!(
            "The user sent {} image(s) that could not be analyzed. \
             Answer their request as well as possible from the text alone: {}",
            task.attachments.len(),
            task.prompt_or_default("Please describe the image."),
        ),
        Capability::ImageGenerate => format!(
            "Image generation is unavailable right now. \
             Write a vivid description of the requested image instead: {}",
            task.prompt_or_default(""),
        ),
    }
}

fn success_response(mode: Mode, result: &RouteResult, source: Option<String>) -> ChatResponse {
    let text = match result.payload.as_ref() {
        Some(RoutePayload::Text(t)) => t.clone(),
        Some(RoutePayload::Image { mime, data }) => {
            format!("IMAGE_GENERATED:{}", to_data_uri(mime, data))
        }
        None => String::new(),
    };
    ChatResponse {
        success: true,
        text,
        mode: mode.to_string(),
        model_used: result.winning.as_ref().map(|c| c.model.clone()),
        source,
    }
}

fn exhaustion_text(mode: Mode, result: &RouteResult) -> String {
    let last = result
        .attempts
        .last()
        .and_then(|a| a.error_detail.clone())
        .unwrap_or_else(|| "unknown error".to_string());
    if result.exhausted() {
        format!(
            "All {} candidate model(s) for {} are currently unavailable. Last error: {}",
            result.attempts.len(),
            mode,
            last
        )
    } else {
        format!("The {} request could not be served: {}", mode, last)
    }
}
