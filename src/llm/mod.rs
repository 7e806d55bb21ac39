//! Model provider clients and the fallback router
//!
//! Three hosted providers are supported, all reached over plain REST with
//! `reqwest`:
//! - **Groq** and **OpenRouter** through the OpenAI-compatible chat completions API
//! - **Gemini** through the `generateContent` API
//!
//! The [`ProviderRouter`] tries the configured providers in order and returns
//! the first usable response.

pub mod client;
pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use client::{create_client, LLMClient};
pub use gemini::GeminiClient;
pub use openai_compat::OpenAiCompatClient;
pub use router::{ProviderRouter, Routed, RoutedProvider};

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// The closed set of model providers shown in `llm_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Groq,
    Gemini,
    OpenRouter,
}

impl ProviderName {
    pub const ALL: [ProviderName; 3] = [
        ProviderName::Groq,
        ProviderName::Gemini,
        ProviderName::OpenRouter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Groq => "groq",
            ProviderName::Gemini => "gemini",
            ProviderName::OpenRouter => "openrouter",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderName::Groq => "GROQ_API_KEY",
            ProviderName::Gemini => "GEMINI_API_KEY",
            ProviderName::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderName::Groq => "llama-3.1-8b-instant",
            ProviderName::Gemini => "gemini-2.0-flash",
            ProviderName::OpenRouter => "google/gemini-2.0-flash-exp:free",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderName::Groq => "https://api.groq.com/openai/v1",
            ProviderName::Gemini => "https://generativelanguage.googleapis.com",
            ProviderName::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single provider attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Auth,
    RateLimit,
    Timeout,
    Malformed,
    Http,
    Unavailable,
}

impl ProviderErrorKind {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderErrorKind::Auth,
            429 => ProviderErrorKind::RateLimit,
            408 | 504 => ProviderErrorKind::Timeout,
            _ => ProviderErrorKind::Http,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderErrorKind::Auth => "authentication failed",
            ProviderErrorKind::RateLimit => "rate limited",
            ProviderErrorKind::Timeout => "timed out",
            ProviderErrorKind::Malformed => "malformed response",
            ProviderErrorKind::Http => "http error",
            ProviderErrorKind::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// A failed attempt against one provider
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: ProviderName,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderName, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_reqwest(provider: ProviderName, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_decode() {
            ProviderErrorKind::Malformed
        } else if let Some(status) = err.status() {
            ProviderErrorKind::from_status(status)
        } else {
            ProviderErrorKind::Unavailable
        };
        Self::new(provider, kind, err.to_string())
    }

    /// Build the error for a non-success HTTP response
    pub(crate) async fn from_response(provider: ProviderName, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Self::new(
            provider,
            ProviderErrorKind::from_status(status),
            format!("HTTP {}: {}", status.as_u16(), snippet),
        )
    }
}

impl From<ProviderError> for crate::types::AppError {
    fn from(err: ProviderError) -> Self {
        crate::types::AppError::Provider(err.to_string())
    }
}
