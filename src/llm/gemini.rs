//! Google Gemini `generateContent` client

use super::{LLMClient, ProviderError, ProviderErrorKind, ProviderName};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: String,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let provider = ProviderName::Gemini;

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(provider, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(provider, response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(provider, ProviderErrorKind::Malformed, e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::Malformed,
                "response contained no candidate text",
            ));
        }

        Ok(text)
    }

    fn provider(&self) -> ProviderName {
        ProviderName::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
