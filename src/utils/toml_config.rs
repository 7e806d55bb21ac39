//! TOML-based configuration for Strata
//!
//! The whole process is configured from a single TOML file (`strata.toml`)
//! loaded once at startup. The resulting [`StrataConfig`] is immutable and is
//! handed to the provider router, data aggregator and workflow engine at
//! construction time. Secrets never live in the file: providers name the
//! environment variable that holds their API key.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8080
//!
//! [[providers]]
//! type = "groq"
//! model = "llama-3.1-8b-instant"
//!
//! [[providers]]
//! type = "gemini"
//!
//! [research]
//! mode = "delegated"
//!
//! [a2a]
//! url = "http://localhost:8001"
//! ```

use crate::llm::ProviderName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from strata.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Model providers in fallback order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub a2a: A2AConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: default_providers(),
            research: ResearchConfig::default(),
            a2a: A2AConfig::default(),
            quality: QualityConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderName,

    /// Environment variable containing the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Override of the provider's public endpoint (tests, proxies)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(kind: ProviderName) -> Self {
        Self {
            kind,
            api_key_env: None,
            model: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout(),
        }
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    ProviderName::ALL
        .iter()
        .map(|kind| ProviderConfig::new(*kind))
        .collect()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_provider_timeout() -> u64 {
    30
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    /// Adapters run in-process, one after another
    #[default]
    Local,
    /// Gathering is delegated to an A2A executor, with local fallback
    Delegated,
}

impl std::fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchMode::Local => write!(f, "local"),
            ResearchMode::Delegated => write!(f, "delegated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub mode: ResearchMode,

    /// Upper bound for a single adapter call
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Number of articles requested from the news search
    #[serde(default = "default_news_results")]
    pub news_results: usize,

    #[serde(default)]
    pub sources: SourceEndpoints,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            mode: ResearchMode::default(),
            source_timeout_secs: default_source_timeout(),
            news_results: default_news_results(),
            sources: SourceEndpoints::default(),
        }
    }
}

impl ResearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Base URLs of the structured metric services. News is served by web search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEndpoints {
    pub fundamentals: Option<String>,
    pub valuation: Option<String>,
    pub volatility: Option<String>,
    #[serde(rename = "macro")]
    pub macro_economy: Option<String>,
    pub sentiment: Option<String>,
}

fn default_source_timeout() -> u64 {
    15
}

fn default_news_results() -> usize {
    5
}

// ============= A2A Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2AConfig {
    /// Base URL of the remote research executor
    #[serde(default)]
    pub url: Option<String>,

    /// Mount the research executor on this server as well
    #[serde(default)]
    pub serve: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for each individual protocol request
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Overall deadline for one delegated gather
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Terminal tasks kept by the executor before pruning
    #[serde(default = "default_task_retention")]
    pub task_retention: usize,
}

impl Default for A2AConfig {
    fn default() -> Self {
        Self {
            url: None,
            serve: false,
            poll_interval_ms: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            deadline_secs: default_deadline(),
            task_retention: default_task_retention(),
        }
    }
}

impl A2AConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_deadline() -> u64 {
    120
}

fn default_task_retention() -> usize {
    256
}

// ============= Quality Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_objective_weight")]
    pub objective_weight: f64,

    #[serde(default = "default_subjective_weight")]
    pub subjective_weight: f64,

    #[serde(default)]
    pub rubric: RubricWeights,

    /// Minimum score accepted without revision
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,

    #[serde(default = "default_max_revisions")]
    pub max_revisions: u8,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            objective_weight: default_objective_weight(),
            subjective_weight: default_subjective_weight(),
            rubric: RubricWeights::default(),
            pass_threshold: default_pass_threshold(),
            max_revisions: default_max_revisions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricWeights {
    #[serde(default = "default_dimension_weight")]
    pub completeness: f64,
    #[serde(default = "default_dimension_weight")]
    pub specificity: f64,
    #[serde(default = "default_dimension_weight")]
    pub relevance: f64,
    #[serde(default = "default_dimension_weight")]
    pub depth: f64,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            completeness: default_dimension_weight(),
            specificity: default_dimension_weight(),
            relevance: default_dimension_weight(),
            depth: default_dimension_weight(),
        }
    }
}

impl RubricWeights {
    fn as_slice(&self) -> [f64; 4] {
        [self.completeness, self.specificity, self.relevance, self.depth]
    }
}

fn default_objective_weight() -> f64 {
    0.4
}

fn default_subjective_weight() -> f64 {
    0.6
}

fn default_dimension_weight() -> f64 {
    0.25
}

fn default_pass_threshold() -> u8 {
    7
}

fn default_max_revisions() -> u8 {
    3
}

// ============= Cache Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// How long a duplicate request waits on an in-flight computation
    #[serde(default = "default_inflight_wait")]
    pub inflight_wait_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: default_ttl_hours(),
            capacity: default_cache_capacity(),
            inflight_wait_secs: default_inflight_wait(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    pub fn inflight_wait(&self) -> Duration {
        Duration::from_secs(self.inflight_wait_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_cache_capacity() -> usize {
    512
}

fn default_inflight_wait() -> u64 {
    300
}

// ============= Loading & Validation =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl StrataConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: StrataConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one provider must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.kind) {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' is listed more than once",
                    provider.kind
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{}' timeout_secs must be positive",
                    provider.kind
                )));
            }
        }

        if self.research.source_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "research.source_timeout_secs must be positive".into(),
            ));
        }

        if self.research.mode == ResearchMode::Delegated
            && self.a2a.url.is_none()
            && !self.a2a.serve
        {
            return Err(ConfigError::ValidationError(
                "delegated research requires a2a.url or a2a.serve = true".into(),
            ));
        }

        if self.a2a.poll_timeout_secs == 0 || self.a2a.deadline_secs == 0 {
            return Err(ConfigError::ValidationError(
                "a2a timeouts must be positive".into(),
            ));
        }

        let q = &self.quality;
        let blend = [q.objective_weight, q.subjective_weight];
        if blend.iter().any(|w| *w < 0.0) || blend.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::ValidationError(
                "quality weights must be non-negative and not all zero".into(),
            ));
        }
        let rubric = q.rubric.as_slice();
        if rubric.iter().any(|w| *w < 0.0) || rubric.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::ValidationError(
                "rubric weights must be non-negative and not all zero".into(),
            ));
        }
        if !(1..=10).contains(&q.pass_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "quality.pass_threshold must be within 1..=10, got {}",
                q.pass_threshold
            )));
        }
        if !(1..=3).contains(&q.max_revisions) {
            return Err(ConfigError::ValidationError(format!(
                "quality.max_revisions must be within 1..=3, got {}",
                q.max_revisions
            )));
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be positive when the cache is enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Read an environment variable referenced from the configuration
pub fn resolve_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
