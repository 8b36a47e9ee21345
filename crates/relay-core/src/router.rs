//! Provider router — priority-ordered candidate fallback
//!
//! Resolves a [`RequestTask`] against a capability-filtered, priority-sorted
//! candidate list: try each candidate in turn, advance on retryable failure,
//! stop on the first success or the first fatal failure. Every attempt is
//! recorded so callers can surface the full history.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, RouteError};
use crate::task::{Candidate, RequestTask, RoutePayload};

/// The injected provider call — one attempt against one candidate
#[async_trait]
pub trait ProviderDispatch: Send + Sync {
    async fn invoke(
        &self,
        candidate: &Candidate,
        task: &RequestTask,
    ) -> Result<RoutePayload, ProviderError>;
}

/// Outcome of one candidate attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    FatalFailure,
}

/// Result of invoking one candidate for one task
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub candidate: Candidate,
    pub outcome: AttemptOutcome,
    pub error_detail: Option<String>,
    /// Per-call monotonic sequence number (0-based), not wall clock
    pub ordinal: u32,
}

/// Final outcome of routing one task
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub succeeded: bool,
    pub payload: Option<RoutePayload>,
    pub winning: Option<Candidate>,
    /// Insertion order equals attempt order; never empty
    pub attempts: Vec<AttemptRecord>,
}

impl RouteResult {
    /// True when every recorded failure was retryable (the partition was
    /// exhausted rather than cut short by a fatal error)
    pub fn exhausted(&self) -> bool {
        !self.succeeded
            && self
                .attempts
                .iter()
                .all(|a| a.outcome == AttemptOutcome::RetryableFailure)
    }
}

/// Routes tasks across candidates with bounded sequential fallback
#[derive(Debug, Clone)]
pub struct Router {
    /// Upper bound on attempts per call, guarding against an overly broad
    /// retryable classification
    max_attempts: usize,
    /// Pause between attempts so a rate-limited provider family is not
    /// hammered in rapid succession
    retry_delay: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Resolve a task to a [`RouteResult`] using candidates from `catalog`.
    ///
    /// Candidates matching the task's capability are tried in non-decreasing
    /// priority order (declaration order breaks ties). Attempts are strictly
    /// sequential; the attempted set and history are local to this call.
    pub async fn route(
        &self,
        dispatch: &dyn ProviderDispatch,
        task: &RequestTask,
        catalog: &[Candidate],
    ) -> Result<RouteResult, RouteError> {
        let mut matching: Vec<&Candidate> = catalog
            .iter()
            .filter(|c| c.capability == task.capability)
            .collect();
        if matching.is_empty() {
            return Err(RouteError::NoCandidates(task.capability));
        }
        matching.sort_by_key(|c| c.priority);

        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for candidate in matching.iter().take(self.max_attempts) {
            let ordinal = attempts.len() as u32;
            if ordinal > 0 && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }

            debug!(
                "Attempt {}: {} model {} ({})",
                ordinal + 1,
                candidate.provider,
                candidate.model,
                task.capability,
            );

            match dispatch.invoke(candidate, task).await {
                Ok(payload) => {
                    if ordinal > 0 {
                        info!(
                            "Request succeeded on fallback candidate {} ({}) after {} failed attempts",
                            candidate.provider, candidate.model, ordinal,
                        );
                    }
                    attempts.push(AttemptRecord {
                        candidate: (*candidate).clone(),
                        outcome: AttemptOutcome::Success,
                        error_detail: None,
                        ordinal,
                    });
                    return Ok(RouteResult {
                        succeeded: true,
                        payload: Some(payload),
                        winning: Some((*candidate).clone()),
                        attempts,
                    });
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    warn!(
                        "Candidate {} ({}) failed (retryable={}): {}",
                        candidate.provider, candidate.model, retryable, e,
                    );
                    attempts.push(AttemptRecord {
                        candidate: (*candidate).clone(),
                        outcome: if retryable {
                            AttemptOutcome::RetryableFailure
                        } else {
                            AttemptOutcome::FatalFailure
                        },
                        error_detail: Some(e.to_string()),
                        ordinal,
                    });
                    if !retryable {
                        break;
                    }
                }
            }
        }

        info!(
            "Routing exhausted for {} after {} attempts",
            task.capability,
            attempts.len()
        );
        Ok(RouteResult {
            succeeded: false,
            payload: None,
            winning: None,
            attempts,
        })
    }
}
