//! OpenAI-compatible chat completions client (Groq, OpenRouter)

use super::{LLMClient, ProviderError, ProviderErrorKind, ProviderName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    provider: ProviderName,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(
        http: reqwest::Client,
        provider: ProviderName,
        base_url: &str,
        api_key: String,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            provider,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAiCompatClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.provider, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(self.provider, response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(self.provider, ProviderErrorKind::Malformed, e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    self.provider,
                    ProviderErrorKind::Malformed,
                    "response contained no message content",
                )
            })
    }

    fn provider(&self) -> ProviderName {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
