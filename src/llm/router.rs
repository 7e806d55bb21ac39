//! Ordered provider fallback
//!
//! A request is tried against each provider once, in configuration order.
//! The first provider that returns a usable response wins; every provider
//! after it is left idle. There are no retries within a provider.
//!
//! # Example
//!
//! ```ignore
//! let router = ProviderRouter::from_config(&config, http)?;
//! let routed = router.generate(SYSTEM, &prompt, &sink).await?;
//! println!("{} via {}", routed.value, routed.provider_used);
//! ```

use super::{create_client, LLMClient, ProviderError, ProviderErrorKind, ProviderName};
use crate::telemetry::ProgressSink;
use crate::types::{AppError, ProviderStatus, Result};
use crate::utils::toml_config::StrataConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One provider slot in the fallback list
#[derive(Clone)]
pub struct RoutedProvider {
    pub client: Arc<dyn LLMClient>,
    pub timeout: Duration,
}

impl RoutedProvider {
    pub fn new(client: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// A successful generation and who produced it
#[derive(Debug, Clone)]
pub struct Routed<T> {
    pub value: T,
    pub provider: ProviderName,
    /// `name:model`, e.g. `groq:llama-3.1-8b-instant`
    pub provider_used: String,
    /// Attempts that failed before the winning one
    pub failures: Vec<ProviderError>,
}

#[derive(Clone)]
pub struct ProviderRouter {
    providers: Vec<RoutedProvider>,
}

impl ProviderRouter {
    pub fn new(providers: Vec<RoutedProvider>) -> Result<Self> {
        if providers.is_empty() {
            return Err(AppError::Configuration(
                "provider router needs at least one provider".into(),
            ));
        }
        Ok(Self { providers })
    }

    /// Build the router from configuration. Providers whose API key is not
    /// set are skipped with a warning.
    pub fn from_config(config: &StrataConfig, http: reqwest::Client) -> Result<Self> {
        let mut providers = Vec::new();
        for entry in &config.providers {
            match create_client(entry, http.clone()) {
                Ok(client) => providers.push(RoutedProvider::new(client, entry.timeout())),
                Err(e) => warn!(provider = %entry.kind, "Provider disabled: {}", e),
            }
        }

        if providers.is_empty() {
            return Err(AppError::Configuration(
                "no provider has an API key configured".into(),
            ));
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<ProviderName> {
        self.providers.iter().map(|p| p.client.provider()).collect()
    }

    /// Generate free text
    pub async fn generate(
        &self,
        system: &str,
        prompt: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Routed<String>> {
        self.generate_with(system, prompt, sink, |text| Ok(text.to_string()))
            .await
    }

    /// Generate and parse. A response rejected by `parse` counts as a
    /// malformed-response failure of that provider and triggers fallback.
    pub async fn generate_with<T, F>(
        &self,
        system: &str,
        prompt: &str,
        sink: &dyn ProgressSink,
        parse: F,
    ) -> Result<Routed<T>>
    where
        F: Fn(&str) -> std::result::Result<T, String>,
    {
        let mut failures: Vec<ProviderError> = Vec::new();

        for (idx, entry) in self.providers.iter().enumerate() {
            let name = entry.client.provider();
            sink.provider_status(name, ProviderStatus::Executing);
            let started = Instant::now();

            let attempt =
                match tokio::time::timeout(entry.timeout, entry.client.generate(system, prompt))
                    .await
                {
                    Ok(Ok(text)) => parse(&text)
                        .map_err(|msg| ProviderError::new(name, ProviderErrorKind::Malformed, msg)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ProviderError::new(
                        name,
                        ProviderErrorKind::Timeout,
                        format!("no response within {}s", entry.timeout.as_secs()),
                    )),
                };

            match attempt {
                Ok(value) => {
                    sink.provider_status(name, ProviderStatus::Completed);
                    for later in &self.providers[idx + 1..] {
                        sink.provider_status(later.client.provider(), ProviderStatus::Idle);
                    }

                    let provider_used = format!("{}:{}", name, entry.client.model_name());
                    let elapsed = started.elapsed().as_secs_f64();
                    info!(provider = %provider_used, elapsed_secs = elapsed, "Generation succeeded");
                    sink.log(&format!("Generated via {} ({:.1}s)", provider_used, elapsed));

                    return Ok(Routed {
                        value,
                        provider: name,
                        provider_used,
                        failures,
                    });
                }
                Err(err) => {
                    warn!(provider = %name, kind = %err.kind, "Provider attempt failed: {}", err.message);
                    sink.provider_status(name, ProviderStatus::Failed);
                    sink.log(&format!("Provider {} failed: {}", name, err.kind));
                    failures.push(err);
                }
            }
        }

        let summary = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        sink.log("All providers failed");
        Err(AppError::ProvidersExhausted(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::NoopSink;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FixedClient {
        name: ProviderName,
        reply: std::result::Result<&'static str, ProviderErrorKind>,
        calls: Mutex<usize>,
    }

    impl FixedClient {
        fn ok(name: ProviderName, text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(text),
                calls: Mutex::new(0),
            })
        }

        fn failing(name: ProviderName, kind: ProviderErrorKind) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(kind),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn generate(&self, _system: &str, _prompt: &str) -> std::result::Result<String, ProviderError> {
            *self.calls.lock() += 1;
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(kind) => Err(ProviderError::new(self.name, kind, "scripted")),
            }
        }

        fn provider(&self) -> ProviderName {
            self.name
        }

        fn model_name(&self) -> &str {
            "test-model"
        }
    }

    #[derive(Default)]
    struct StatusLog(Mutex<Vec<(ProviderName, ProviderStatus)>>);

    impl ProgressSink for StatusLog {
        fn log(&self, _message: &str) {}
        fn provider_status(&self, provider: ProviderName, status: ProviderStatus) {
            self.0.lock().push((provider, status));
        }
        fn source_status(&self, _: crate::research::DataSource, _: crate::types::SourceStatus) {}
        fn metric(&self, _: crate::research::DataSource, _: &str, _: &serde_json::Value) {}
    }

    fn route(clients: Vec<Arc<FixedClient>>) -> ProviderRouter {
        ProviderRouter::new(
            clients
                .into_iter()
                .map(|c| RoutedProvider::new(c as Arc<dyn LLMClient>, Duration::from_secs(5)))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn falls_back_to_second_provider() {
        let a = FixedClient::failing(ProviderName::Groq, ProviderErrorKind::RateLimit);
        let b = FixedClient::ok(ProviderName::Gemini, "draft");
        let c = FixedClient::ok(ProviderName::OpenRouter, "unused");
        let router = route(vec![a.clone(), b.clone(), c.clone()]);
        let sink = StatusLog::default();

        let routed = router.generate("sys", "prompt", &sink).await.unwrap();

        assert_eq!(routed.value, "draft");
        assert_eq!(routed.provider, ProviderName::Gemini);
        assert_eq!(routed.provider_used, "gemini:test-model");
        assert_eq!(routed.failures.len(), 1);
        assert_eq!(*c.calls.lock(), 0);

        let log = sink.0.lock().clone();
        assert_eq!(
            log,
            vec![
                (ProviderName::Groq, ProviderStatus::Executing),
                (ProviderName::Groq, ProviderStatus::Failed),
                (ProviderName::Gemini, ProviderStatus::Executing),
                (ProviderName::Gemini, ProviderStatus::Completed),
                (ProviderName::OpenRouter, ProviderStatus::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn exhausted_list_is_an_error() {
        let router = route(vec![
            FixedClient::failing(ProviderName::Groq, ProviderErrorKind::Auth),
            FixedClient::failing(ProviderName::Gemini, ProviderErrorKind::Timeout),
        ]);

        let err = router.generate("", "p", &NoopSink).await.unwrap_err();
        match err {
            AppError::ProvidersExhausted(msg) => {
                assert!(msg.contains("groq authentication failed"));
                assert!(msg.contains("gemini timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn parse_rejection_counts_as_failure() {
        let router = route(vec![
            FixedClient::ok(ProviderName::Groq, "not json"),
            FixedClient::ok(ProviderName::Gemini, "42"),
        ]);

        let routed = router
            .generate_with("", "p", &NoopSink, |t| t.trim().parse::<u32>().map_err(|e| e.to_string()))
            .await
            .unwrap();

        assert_eq!(routed.value, 42);
        assert_eq!(routed.failures[0].kind, ProviderErrorKind::Malformed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        struct Hanging;

        #[async_trait]
        impl LLMClient for Hanging {
            async fn generate(&self, _: &str, _: &str) -> std::result::Result<String, ProviderError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("late".into())
            }
            fn provider(&self) -> ProviderName {
                ProviderName::Groq
            }
            fn model_name(&self) -> &str {
                "slow"
            }
        }

        let router = ProviderRouter::new(vec![
            RoutedProvider::new(Arc::new(Hanging), Duration::from_secs(30)),
            RoutedProvider::new(
                FixedClient::ok(ProviderName::Gemini, "fast"),
                Duration::from_secs(30),
            ),
        ])
        .unwrap();

        let routed = router.generate("", "p", &NoopSink).await.unwrap();
        assert_eq!(routed.value, "fast");
        assert_eq!(routed.failures[0].kind, ProviderErrorKind::Timeout);
    }

    #[test]
    fn empty_router_is_rejected() {
        assert!(ProviderRouter::new(Vec::new()).is_err());
    }
}
