// Provider module - model provider HTTP client (Messages API shape)

pub mod client;
pub mod error;
pub mod roles;
pub mod types;

pub use client::Provider;
pub use error::{ProviderError, ProviderInitError};
pub use roles::RoleResolver;
pub use types::{
    ContentBlock, Message, MessageRequest, MessageResponse, Role, StopReason, ToolDefinition,
    Usage,
};

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Inference backend URL
    pub endpoint: String,
    /// API key for authentication
    pub api_key: String,
    /// Primary model identifier
    pub model: String,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Base retry delay in milliseconds
    pub base_retry_delay_ms: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum output tokens per response
    pub max_output_tokens: u32,
    /// Temperature (None = model default)
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ProviderInitError> {
        dotenvy::dotenv().ok();

        let endpoint = std::env::var("COQUI_ENDPOINT")
            .map_err(|_| ProviderInitError::ConfigMissing("COQUI_ENDPOINT".into()))?;
        let api_key = std::env::var("COQUI_API_KEY")
            .map_err(|_| ProviderInitError::ConfigMissing("COQUI_API_KEY".into()))?;
        let model = std::env::var("COQUI_MODEL")
            .map_err(|_| ProviderInitError::ConfigMissing("COQUI_MODEL".into()))?;

        let max_retries = std::env::var("COQUI_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let base_retry_delay_ms = std::env::var("COQUI_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let request_timeout_secs = std::env::var("COQUI_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let max_output_tokens = std::env::var("COQUI_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4096);

        let temperature = std::env::var("COQUI_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok());

        Ok(Self {
            endpoint,
            api_key,
            model,
            max_retries,
            base_retry_delay_ms,
            request_timeout_secs,
            max_output_tokens,
            temperature,
        })
    }
}
