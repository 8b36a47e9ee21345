//! relay-gateway — HTTP surface for the relay router
//!
//! Serves `POST /api/chat` and `GET /api/status` over axum, validating and
//! shaping requests around the provider router in relay-core, including the
//! optional cross-provider fallback pass.

pub mod fallback;
pub mod protocol;
pub mod server;

pub use fallback::{HandleError, handle_chat};
pub use protocol::{ChatRequest, ChatResponse, MediaType, Mode};
pub use server::{GatewayServer, GatewayState};
