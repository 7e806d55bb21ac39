//! Provider client abstraction

use super::{GeminiClient, OpenAiCompatClient, ProviderError, ProviderName};
use crate::utils::toml_config::{resolve_env, ConfigError, ProviderConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Generic model client trait for provider abstraction
///
/// One call is one attempt: implementations never retry internally, the
/// router substitutes providers instead.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion for `prompt` under the given system instruction
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;

    /// Which provider this client talks to
    fn provider(&self) -> ProviderName;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Build a client from its configuration entry, resolving the API key from
/// the environment.
pub fn create_client(
    config: &ProviderConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn LLMClient>, ConfigError> {
    let api_key = resolve_env(config.api_key_env())?;

    let client: Arc<dyn LLMClient> = match config.kind {
        ProviderName::Groq | ProviderName::OpenRouter => Arc::new(OpenAiCompatClient::new(
            http,
            config.kind,
            config.base_url(),
            api_key,
            config.model(),
            config.temperature,
            config.max_tokens,
        )),
        ProviderName::Gemini => Arc::new(GeminiClient::new(
            http,
            config.base_url(),
            api_key,
            config.model(),
            config.temperature,
            config.max_tokens,
        )),
    };

    Ok(client)
}
