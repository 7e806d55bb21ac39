//! Mock implementations for testing.
//!
//! Scripted model clients, canned data sources and a recording progress sink
//! shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strata::llm::{LLMClient, ProviderError, ProviderErrorKind, ProviderName};
use strata::quality::rubric::CRITIC_SYSTEM;
use strata::research::{DataSource, DataSourceAdapter, SourceData, SourceReport};
use strata::telemetry::ProgressSink;
use strata::types::{AppError, ProviderStatus, Result, SourceStatus};
use strata::workflows::prompts::EDITOR_SYSTEM;

/// A draft that passes every structural check against all six sources.
pub const GOOD_DRAFT: &str = "\
Strengths
- Revenue of $96.8B grew 19% with net margin of 15.5% and strong cash flow
- Market cap near $800B on a P/E: 45 valuation
Weaknesses
- Beta: 2 shows high volatility; VIX: 18 adds price swing risk
- Debt rose 12% in 2024
Opportunities
- GDP growth of 2.1% and an easing interest rate path support demand
- Analyst news coverage highlights energy storage
Threats
- Bearish sentiment at 42/100 in recent headlines
- Inflation of 3.2% pressures input costs";

/// Model client that answers from a script.
///
/// Analyzer and editor prompts get [`GOOD_DRAFT`]. Critic prompts get a
/// rubric where every dimension equals the next queued score; the last score
/// repeats once the queue is down to one.
///
/// # Examples
///
/// ```ignore
/// // Passes on the first critic pass
/// let client = ScriptedLLMClient::new(ProviderName::Groq).with_scores([9]);
///
/// // Fails twice, then passes
/// let client = ScriptedLLMClient::new(ProviderName::Groq).with_scores([2, 2, 9]);
///
/// // Always rate limited
/// let client = ScriptedLLMClient::failing(ProviderName::Groq, ProviderErrorKind::RateLimit);
/// ```
pub struct ScriptedLLMClient {
    provider: ProviderName,
    model: String,
    failure: Option<ProviderErrorKind>,
    scores: Mutex<VecDeque<u8>>,
    critic_delay: Duration,
    critic_delays: Mutex<VecDeque<Duration>>,
    calls: AtomicUsize,
    critic_calls: AtomicUsize,
    editor_calls: AtomicUsize,
}

impl ScriptedLLMClient {
    pub fn new(provider: ProviderName) -> Self {
        Self {
            provider,
            model: "mock-model".to_string(),
            failure: None,
            scores: Mutex::new(VecDeque::from([9])),
            critic_delay: Duration::ZERO,
            critic_delays: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            critic_calls: AtomicUsize::new(0),
            editor_calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with `kind`.
    pub fn failing(provider: ProviderName, kind: ProviderErrorKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::new(provider)
        }
    }

    pub fn with_scores(self, scores: impl IntoIterator<Item = u8>) -> Self {
        *self.scores.lock() = scores.into_iter().collect();
        self
    }

    /// Hold every critic call for `delay` before answering.
    pub fn with_critic_delay(mut self, delay: Duration) -> Self {
        self.critic_delay = delay;
        self
    }

    /// Hold only the first critic call for `delay`.
    pub fn with_first_critic_delay(self, delay: Duration) -> Self {
        self.critic_delays.lock().push_back(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn critic_calls(&self) -> usize {
        self.critic_calls.load(Ordering::SeqCst)
    }

    pub fn editor_calls(&self) -> usize {
        self.editor_calls.load(Ordering::SeqCst)
    }

    fn next_score(&self) -> u8 {
        let mut scores = self.scores.lock();
        if scores.len() > 1 {
            scores.pop_front().unwrap_or(9)
        } else {
            scores.front().copied().unwrap_or(9)
        }
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn generate(&self, system: &str, _prompt: &str) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.failure {
            return Err(ProviderError::new(self.provider, kind, "scripted failure"));
        }

        if system == CRITIC_SYSTEM {
            self.critic_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.critic_delays.lock().pop_front().unwrap_or(self.critic_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return Ok(rubric_json(self.next_score()));
        }

        if system == EDITOR_SYSTEM {
            self.editor_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(GOOD_DRAFT.to_string())
    }

    fn provider(&self) -> ProviderName {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub fn rubric_json(score: u8) -> String {
    json!({
        "completeness": score,
        "specificity": score,
        "relevance": score,
        "depth": score,
        "reasoning": "scripted"
    })
    .to_string()
}

/// Data source that returns a fixed result.
pub struct StaticSourceAdapter {
    source: DataSource,
    outcome: std::result::Result<SourceData, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticSourceAdapter {
    pub fn healthy(source: DataSource) -> Self {
        let mut data = SourceData::default();
        data.metrics
            .insert(format!("{}_metric", source.as_str()), json!(42.5));
        Self {
            source,
            outcome: Ok(data),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(source: DataSource) -> Self {
        Self {
            source,
            outcome: Err(format!("{} endpoint unavailable", source.as_str())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSourceAdapter for StaticSourceAdapter {
    fn source(&self) -> DataSource {
        self.source
    }

    async fn fetch(&self, _company: &str, _ticker: Option<&str>) -> Result<SourceData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone().map_err(AppError::DataSource)
    }
}

/// Everything a component reported, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Log(String),
    Provider(ProviderName, ProviderStatus),
    Source(DataSource, SourceStatus),
    Metric(DataSource, String, Value),
    Report(DataSource, SourceStatus),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn provider_events(&self) -> Vec<(ProviderName, ProviderStatus)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Provider(p, s) => Some((p, s)),
                _ => None,
            })
            .collect()
    }

    pub fn final_source_status(&self, source: DataSource) -> Option<SourceStatus> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                SinkEvent::Source(s, status) if s == source => Some(status),
                _ => None,
            })
    }
}

impl ProgressSink for RecordingSink {
    fn log(&self, message: &str) {
        self.events.lock().push(SinkEvent::Log(message.to_string()));
    }

    fn provider_status(&self, provider: ProviderName, status: ProviderStatus) {
        self.events.lock().push(SinkEvent::Provider(provider, status));
    }

    fn source_status(&self, source: DataSource, status: SourceStatus) {
        self.events.lock().push(SinkEvent::Source(source, status));
    }

    fn metric(&self, source: DataSource, name: &str, value: &Value) {
        self.events
            .lock()
            .push(SinkEvent::Metric(source, name.to_string(), value.clone()));
    }

    fn report(&self, report: &SourceReport) {
        self.events
            .lock()
            .push(SinkEvent::Report(report.source, report.status));
    }
}
