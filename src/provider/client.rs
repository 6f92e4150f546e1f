// Provider client - HTTP communication with the inference backend

use super::{MessageRequest, MessageResponse, ProviderConfig, ProviderError};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Model provider client. Cheap to clone; clones share the HTTP pool.
#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
    client: Client,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Result<Self, super::ProviderInitError> {
        info!(
            endpoint = %config.endpoint,
            model = %config.model,
            timeout_secs = config.request_timeout_secs,
            max_retries = config.max_retries,
            "initializing provider"
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(super::ProviderInitError::ClientError)?;

        Ok(Self { config, client })
    }

    /// Primary model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.config.max_output_tokens
    }

    pub fn temperature(&self) -> Option<f32> {
        self.config.temperature
    }

    /// Clone of this provider bound to a different model. Used for child
    /// agents whose role resolves to another model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        let mut clone = self.clone();
        clone.config.model = model.into();
        clone
    }

    /// Perform inference, retrying transient failures with exponential
    /// backoff. Returns the last error once retries are exhausted.
    pub async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, ProviderError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "starting inference"
        );

        let start = Instant::now();
        let base_delay = Duration::from_millis(self.config.base_retry_delay_ms);
        let mut retries = 0;

        loop {
            match self.send_request(&request).await {
                Ok(response) => {
                    let (input_tokens, output_tokens) = response
                        .usage
                        .as_ref()
                        .map(|u| (u.input_tokens, u.output_tokens))
                        .unwrap_or((0, 0));

                    info!(
                        model = %response.model,
                        input_tokens = input_tokens,
                        output_tokens = output_tokens,
                        latency_ms = start.elapsed().as_millis() as u64,
                        retries = retries,
                        stop_reason = ?response.stop_reason,
                        "inference completed"
                    );
                    return Ok(response);
                }
                Err(e) if !e.is_transient() => {
                    error!(error = %e, "inference failed with permanent error");
                    return Err(e);
                }
                Err(e) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        error!(
                            retries = retries,
                            total_latency_ms = start.elapsed().as_millis() as u64,
                            error = %e,
                            "inference failed: exhausted retries"
                        );
                        return Err(ProviderError::Exhausted {
                            retries,
                            last_error: e.to_string(),
                        });
                    }

                    let multiplier = 2u64.saturating_pow(retries - 1);
                    let delay_ms = (base_delay.as_millis() as u64 * multiplier).min(30_000);

                    warn!(
                        retry = retries,
                        max_retries = self.config.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "inference failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn send_request(&self, request: &MessageRequest) -> Result<MessageResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", &self.config.api_key))
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "received HTTP response");

        if status.is_success() {
            let body = response.text().await?;
            let parsed: MessageResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 => ProviderError::AuthenticationFailed(body),
            400 => ProviderError::InvalidRequest(body),
            402 => ProviderError::InsufficientBalance(body),
            429 => ProviderError::RateLimited(body),
            _ if status.is_server_error() => ProviderError::Backend(body),
            s => ProviderError::InvalidRequest(format!("HTTP {}: {}", s, body)),
        })
    }
}
