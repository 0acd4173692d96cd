//! Retrying invoker - the single chokepoint for every remote model call.
//!
//! Each transport attempt reports an explicit outcome (`Ok`, `Retryable`,
//! `Fatal`) and the retry loop pattern-matches on it; no exception-style
//! control flow. Client errors are surfaced immediately, transient classes
//! are retried with exponential backoff, and the final attempt's error is
//! surfaced, never swallowed.

use async_trait::async_trait;
use foreman_common::wire::{ChatRequest, ChatResponse};
use foreman_common::{snippet, ForemanConfig, ForemanError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of one transport attempt.
pub enum CallOutcome {
    Ok(ChatResponse),
    Retryable(ForemanError),
    Fatal(ForemanError),
}

/// One outbound call to the chat endpoint.
///
/// `operation` is the human-readable name of the calling stage, used for
/// logging and timeout attribution.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn execute(&self, request: &ChatRequest, operation: &str) -> CallOutcome;
}

/// Production transport over reqwest.
///
/// One client per transport; the configured timeout is the per-call ceiling
/// and the client's pool handles connection release on every exit path.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ForemanConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.chat_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn execute(&self, request: &ChatRequest, operation: &str) -> CallOutcome {
        let response = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return CallOutcome::Retryable(ForemanError::UpstreamTimeout {
                    operation: operation.to_string(),
                })
            }
            Err(e) => return CallOutcome::Retryable(ForemanError::Network(e.to_string())),
        };

        let status = response.status();
        if status.is_client_error() {
            let detail = snippet(&response.text().await.unwrap_or_default());
            return CallOutcome::Fatal(ForemanError::UpstreamClientError {
                status: status.as_u16(),
                detail,
            });
        }
        if status.is_server_error() {
            let detail = snippet(&response.text().await.unwrap_or_default());
            return CallOutcome::Retryable(ForemanError::UpstreamServerError {
                status: status.as_u16(),
                detail,
            });
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => CallOutcome::Ok(body),
            Err(e) => CallOutcome::Retryable(ForemanError::Network(format!(
                "undecodable response body: {}",
                e
            ))),
        }
    }
}

/// Bounded exponential-backoff wrapper around a transport.
pub struct RetryingInvoker {
    transport: Arc<dyn ChatTransport>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingInvoker {
    pub fn new(transport: Arc<dyn ChatTransport>, config: &ForemanConfig) -> Self {
        Self {
            transport,
            max_retries: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Delay before the retry following the 0-based `attempt`th failure.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Execute the request, retrying transient failures up to the configured
    /// attempt budget.
    pub async fn invoke(
        &self,
        request: &ChatRequest,
        operation: &str,
    ) -> Result<ChatResponse, ForemanError> {
        let mut attempt: u32 = 0;
        loop {
            info!(
                "{} - attempt {}/{}",
                operation,
                attempt + 1,
                self.max_retries
            );

            match self.transport.execute(request, operation).await {
                CallOutcome::Ok(response) => return Ok(response),
                CallOutcome::Fatal(e) => {
                    error!("{} - not retryable: {}", operation, e);
                    return Err(e);
                }
                CallOutcome::Retryable(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        error!("{} - all retries exhausted: {}", operation, e);
                        return Err(e);
                    }
                    let delay = self.backoff_delay(attempt - 1);
                    warn!(
                        "{} - transient failure: {}. Retrying in {:?} ({}/{})",
                        operation, e, delay, attempt, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
