//! # Strata - quality-controlled SWOT reports
//!
//! Strata produces a strategic SWOT report for a company. A fixed workflow
//! gathers data from six independent sources, drafts the analysis with a
//! language model, scores the draft and revises it until it passes a quality
//! bar or the revision budget runs out.
//!
//! ## Overview
//!
//! Strata can be used in two ways:
//!
//! 1. **As a server** - run the `strata` binary (`strata serve`)
//! 2. **As a library** - build an [`AppState`] and drive workflows directly
//!
//! ### Library Example
//!
//! ```rust,ignore
//! use strata::{AppState, StrataConfig, types::AnalysisRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StrataConfig::load("strata.toml")?;
//!     let state = AppState::from_config(config)?;
//!
//!     let done = state
//!         .workflows
//!         .run_to_completion(AnalysisRequest::new("Tesla").with_ticker("TSLA"))
//!         .await?;
//!     println!("{:?}", done.report);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`workflows`] - step machine, revision loop, cache and service
//! - [`quality`] - objective checks plus model-judged rubric
//! - [`research`] - data source adapters and the aggregator
//! - [`a2a`] - delegated research over JSON-RPC
//! - [`llm`] - provider clients and the fallback router
//! - [`api`] - REST handlers and routes
//! - [`types`] - request/response types and errors
//!
//! ## Research Modes
//!
//! | mode | behaviour |
//! |------|-----------|
//! | `local` | adapters run one after another in-process |
//! | `delegated` | an A2A executor runs them concurrently; falls back to local per request |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agent-to-agent research delegation.
pub mod a2a;
/// HTTP API handlers and routes.
pub mod api;
/// Command line parsing and output.
pub mod cli;
/// LLM provider clients and the fallback router.
pub mod llm;
/// Draft scoring.
pub mod quality;
/// Data gathering.
pub mod research;
/// Progress reporting seam.
pub mod telemetry;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration loading.
pub mod utils;
/// The SWOT workflow.
pub mod workflows;

pub use llm::{LLMClient, ProviderRouter};
pub use types::{AppError, Result};
pub use utils::toml_config::StrataConfig;
pub use workflows::{WorkflowEngine, WorkflowService};

use crate::a2a::{AgentCard, HttpA2AClient, RemoteResearch, TaskManager, TaskTransport};
use crate::research::{adapters_from_config, DataAggregator};
use crate::utils::toml_config::ResearchMode;
use crate::workflows::{AnalysisCache, InMemoryWorkflowStore, WorkflowStore};
use std::sync::Arc;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup
    pub config: Arc<StrataConfig>,
    /// Provider router shared by every workflow
    pub router: Arc<ProviderRouter>,
    /// Workflow lifecycle service
    pub workflows: Arc<WorkflowService>,
    /// Local research executor, present when `a2a.serve` is set
    pub task_manager: Option<Arc<TaskManager>>,
}

impl AppState {
    /// Wire every component from configuration
    pub fn from_config(config: StrataConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("strata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let router = Arc::new(ProviderRouter::from_config(&config, http.clone())?);
        let aggregator = Arc::new(DataAggregator::new(
            adapters_from_config(&config.research, http.clone()),
            config.research.source_timeout(),
        ));

        let task_manager = if config.a2a.serve {
            let card_url = format!("http://{}:{}", config.server.host, config.server.port);
            Some(Arc::new(TaskManager::new(
                aggregator.clone(),
                AgentCard::research_executor(card_url),
                config.a2a.task_retention,
            )))
        } else {
            None
        };

        let mut engine = WorkflowEngine::new(router.clone(), aggregator, config.quality.clone());

        if config.research.mode == ResearchMode::Delegated {
            let transport: Arc<dyn TaskTransport> = match (&config.a2a.url, &task_manager) {
                (Some(url), _) => Arc::new(HttpA2AClient::new(http.clone(), url.clone())),
                (None, Some(manager)) => manager.clone(),
                (None, None) => {
                    return Err(AppError::Configuration(
                        "delegated research needs a2a.url or a2a.serve".into(),
                    ))
                }
            };
            engine = engine.with_remote(Arc::new(RemoteResearch::new(transport, &config.a2a)));
        }

        if config.cache.enabled {
            engine = engine.with_cache(Arc::new(AnalysisCache::from_config(&config.cache)));
        }

        info!(
            providers = ?router.provider_names(),
            research_mode = %config.research.mode,
            cache = config.cache.enabled,
            "Application state ready"
        );

        let store: Arc<dyn WorkflowStore> = Arc::new(InMemoryWorkflowStore::new());
        let workflows = Arc::new(WorkflowService::new(Arc::new(engine), store));

        Ok(Self {
            config: Arc::new(config),
            router,
            workflows,
            task_manager,
        })
    }
}
