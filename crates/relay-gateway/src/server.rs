//! Gateway HTTP server — Axum router and handlers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router as AxumRouter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use relay_core::{Catalog, ProviderDispatch, Router};

use crate::fallback::{HandleError, handle_chat};
use crate::protocol::ChatRequest;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct GatewayState {
    pub catalog: Arc<Catalog>,
    pub dispatch: Arc<dyn ProviderDispatch>,
    pub router: Router,
    pub start_time: Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(
        bind: SocketAddr,
        catalog: Arc<Catalog>,
        dispatch: Arc<dyn ProviderDispatch>,
        router: Router,
    ) -> Self {
        let state = GatewayState {
            catalog,
            dispatch,
            router,
            start_time: Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router.
    ///
    /// The permissive CORS layer answers OPTIONS preflights; axum's method
    /// routing answers non-POST on /api/chat with 405.
    pub fn router(&self) -> AxumRouter {
        AxumRouter::new()
            .route("/api/chat", post(chat_handler))
            .route("/api/status", get(status_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Relay gateway listening on {}", self.bind);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

async fn chat_handler(
    State(state): State<GatewayState>,
    axum::Json(req): axum::Json<ChatRequest>,
) -> impl IntoResponse {
    match handle_chat(&state, &req).await {
        Ok(resp) => (StatusCode::OK, axum::Json(resp)).into_response(),
        Err(HandleError::BadRequest(message)) => (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
        Err(HandleError::Internal(message)) => {
            error!("Chat request failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "error": message })),
            )
                .into_response()
        }
    }
}

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    axum::Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": uptime,
        "catalog": state.catalog.summary(),
    }))
}
