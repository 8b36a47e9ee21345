//! relay-core — multi-provider routing for generative-AI requests
//!
//! This crate provides:
//! - The candidate catalog: capability-tagged, priority-ordered (provider,
//!   model) pairs loaded once from configuration
//! - A structured error taxonomy splitting retryable-switch-model failures
//!   from fatal ones
//! - The [`Router`], which tries candidates sequentially and records every
//!   attempt
//! - HTTP clients for Gemini, Grok, Hugging Face and Stability behind the
//!   [`providers::ProviderClient`] trait

pub mod catalog;
pub mod error;
pub mod providers;
pub mod router;
pub mod task;

pub use catalog::{Catalog, PartitionConfig, ProvidersConfig, RouterConfig};
pub use error::{CatalogError, ProviderError, RouteError};
pub use providers::Dispatcher;
pub use router::{AttemptOutcome, AttemptRecord, ProviderDispatch, RouteResult, Router};
pub use task::{Attachment, Candidate, Capability, ProviderId, RequestTask, RoutePayload};
