//! Enhancement orchestrator
//!
//! Drives one logical enhancement request to completion or terminal failure:
//! candidate fallback in priority order, per-candidate retry with linear
//! backoff, an adaptive per-attempt deadline that grows with recent failure
//! history, and cooperative cancellation observed at every suspension point.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::EnhanceError;
use crate::service::{complete_chat, DEFAULT_RETRY_AFTER};

use super::connection::ConnectionTracker;
use super::parser::{parse_response, EnhancementResult};
use super::prompt::{build_prompt, EnhancementRequest};

/// Tunable orchestration parameters.
///
/// Defaults follow the production policy; tests construct instances with
/// short durations to exercise the retry machinery quickly.
#[derive(Debug, Clone)]
pub struct EnhancerOptions {
    /// Retry budget per model candidate
    pub max_attempts_per_model: usize,
    /// Deadline for an attempt with no recent failures
    pub base_timeout: Duration,
    /// Deadline extension per consecutive failure
    pub timeout_step: Duration,
    /// Upper bound on the adaptive deadline
    pub max_timeout: Duration,
    /// Backoff unit; the delay grows linearly with the attempt number
    pub backoff_step: Duration,
    /// Upper bound on the backoff delay
    pub max_backoff: Duration,
    /// Wait after a 429 response without a Retry-After header
    pub rate_limit_fallback: Duration,
}

impl Default for EnhancerOptions {
    fn default() -> Self {
        Self {
            max_attempts_per_model: 4,
            base_timeout: Duration::from_secs(30),
            timeout_step: Duration::from_secs(5),
            max_timeout: Duration::from_secs(60),
            backoff_step: Duration::from_secs(1),
            max_backoff: Duration::from_secs(3),
            rate_limit_fallback: DEFAULT_RETRY_AFTER,
        }
    }
}

/// Enhancement client
pub struct EnhancementClient {
    config: Arc<Config>,
    client: Client,
    tracker: Arc<ConnectionTracker>,
    options: EnhancerOptions,
}

impl EnhancementClient {
    /// Create a client with production defaults
    pub fn new(config: Arc<Config>, tracker: Arc<ConnectionTracker>) -> Result<Self, EnhanceError> {
        Self::with_options(config, tracker, EnhancerOptions::default())
    }

    /// Create a client with explicit orchestration parameters
    pub fn with_options(
        config: Arc<Config>,
        tracker: Arc<ConnectionTracker>,
        options: EnhancerOptions,
    ) -> Result<Self, EnhanceError> {
        // No client-level timeout: each attempt carries its own adaptive deadline
        let client = Client::builder()
            .build()
            .map_err(|e| EnhanceError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            tracker,
            options,
        })
    }

    /// Connection tracker shared with this client
    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    /// Drive one enhancement request to a result or a terminal failure.
    ///
    /// Candidates are tried in priority order, each with a fixed retry
    /// budget. Success short-circuits everything remaining; cancellation
    /// propagates immediately without retrying or advancing candidates.
    pub async fn enhance(
        &self,
        request: &EnhancementRequest,
        cancel: &CancellationToken,
    ) -> Result<EnhancementResult, EnhanceError> {
        if request.content.trim().is_empty() {
            return Err(EnhanceError::Configuration(
                "prompt content cannot be empty".to_string(),
            ));
        }

        let instruction = build_prompt(request)?;

        info!(
            "Starting enhancement: level={} context={} candidates={}",
            request.level,
            request.context,
            self.config.models.len()
        );

        let mut attempts_made = 0usize;
        let mut last_error = EnhanceError::Network("no attempts were made".to_string());

        for (candidate_idx, model) in self.config.models.iter().enumerate() {
            for attempt in 0..self.options.max_attempts_per_model {
                if cancel.is_cancelled() {
                    return Err(EnhanceError::Cancelled);
                }

                attempts_made += 1;
                let deadline = self.adaptive_timeout();

                let outcome = self.attempt(model, &instruction, deadline, cancel).await;

                match outcome {
                    Ok(raw) => {
                        self.tracker.record_success();
                        let result = parse_response(&raw);
                        info!(
                            "Enhancement succeeded: model={} attempt={} confidence={:.2}",
                            model,
                            attempt + 1,
                            result.confidence
                        );
                        return Ok(result);
                    }
                    Err(EnhanceError::Cancelled) => return Err(EnhanceError::Cancelled),
                    Err(err @ EnhanceError::Configuration(_)) => {
                        // Credential/config problems cannot be retried away
                        return Err(err);
                    }
                    Err(err) => {
                        self.tracker.record_failure();
                        warn!(
                            "Attempt {}/{} on {} failed: {}",
                            attempt + 1,
                            self.options.max_attempts_per_model,
                            model,
                            err
                        );

                        if let EnhanceError::RateLimited { retry_after } = &err {
                            let wait = retry_after.unwrap_or(self.options.rate_limit_fallback);
                            info!("Rate limited, honoring retry delay of {:?}", wait);
                            self.wait(wait, cancel).await?;
                        }

                        last_error = err;

                        if attempt + 1 < self.options.max_attempts_per_model {
                            self.wait(self.backoff_delay(attempt), cancel).await?;
                        } else if candidate_idx + 1 < self.config.models.len() {
                            warn!("Retry budget exhausted for {}, advancing candidate", model);
                        }
                    }
                }
            }
        }

        self.tracker.mark_disconnected();
        Err(EnhanceError::Exhausted {
            attempts: attempts_made,
            source: Box::new(last_error),
        })
    }

    /// Run one network attempt raced against the deadline and the token.
    ///
    /// Whichever resolves first wins; dropping the losing futures aborts the
    /// in-flight call and clears the pending timer on every exit path.
    async fn attempt(
        &self,
        model: &str,
        instruction: &str,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, EnhanceError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(EnhanceError::Cancelled),
            result = tokio::time::timeout(
                deadline,
                complete_chat(&self.client, &self.config, model, instruction),
            ) => match result {
                Ok(inner) => inner,
                Err(_) => Err(EnhanceError::Timeout(deadline)),
            },
        }
    }

    /// Per-attempt deadline extended by recent consecutive failures
    fn adaptive_timeout(&self) -> Duration {
        let failures = self.tracker.consecutive_failures();
        let extended = self.options.base_timeout + self.options.timeout_step * failures;
        extended.min(self.options.max_timeout)
    }

    /// Linearly increasing backoff, capped
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let delay = self.options.backoff_step * (attempt as u32 + 1);
        delay.min(self.options.max_backoff)
    }

    /// Cancellation-aware sleep
    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), EnhanceError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(EnhanceError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
